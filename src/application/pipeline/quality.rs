//! 完成前的质量检查

use super::PipelineError;

/// 出现在译文中即视为模型返回了错误信息
const ERROR_SENTINELS: &[&str] = &["[ERROR", "ERROR:", "I'm sorry, but I can't", "As an AI"];

/// 检查译文文本本身
pub(crate) fn check_text(text: &str) -> Result<(), PipelineError> {
    if text.trim().is_empty() {
        return Err(PipelineError::Validation("translation is empty".to_string()));
    }
    if let Some(sentinel) = ERROR_SENTINELS.iter().find(|s| text.contains(*s)) {
        return Err(PipelineError::Validation(format!(
            "translation contains error marker {:?}",
            sentinel
        )));
    }
    Ok(())
}

/// 标记章节完成前的最终检查
pub(crate) fn check_chapter(
    text: &str,
    total_tokens: u64,
    total_duration_ms: u64,
) -> Result<(), PipelineError> {
    check_text(text)?;
    if total_tokens == 0 && total_duration_ms == 0 {
        return Err(PipelineError::Validation(
            "no model work recorded for chapter".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_sentinels() {
        assert!(check_text("  \n").is_err());
        assert!(check_text("[ERROR] upstream failed").is_err());
        assert!(check_text("I'm sorry, but I can't help with that.").is_err());
        assert!(check_text("Джон вошёл в комнату.").is_ok());
    }

    #[test]
    fn test_rejects_zero_work() {
        assert!(check_chapter("Текст", 0, 0).is_err());
        assert!(check_chapter("Текст", 0, 12).is_ok());
        assert!(check_chapter("Текст", 40, 0).is_ok());
    }
}
