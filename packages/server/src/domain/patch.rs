//! Applying diff-match-patch text patches to live-edited code.

use diff_match_patch_rs::{Compat, DiffMatchPatch};

use super::ApiError;

/// Result of applying a patch. Hunks that could not be placed leave the
/// corresponding part of the text unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub text: String,
    pub failed_hunks: usize,
}

impl PatchOutcome {
    pub fn fully_applied(&self) -> bool {
        self.failed_hunks == 0
    }
}

/// Parses `patch` (diff-match-patch text format) and applies it to
/// `current`. Offsets are counted in characters.
pub fn apply_text_patch(current: &str, patch: &str) -> Result<PatchOutcome, ApiError> {
    let dmp = DiffMatchPatch::new();
    let patches = dmp
        .patch_from_text::<Compat>(patch)
        .map_err(|err| ApiError::JsonFormat(format!("malformed patch: {err:?}")))?;
    let (text, applied) = dmp
        .patch_apply(&patches, current)
        .map_err(|err| ApiError::JsonFormat(format!("patch could not be applied: {err:?}")))?;

    Ok(PatchOutcome {
        text,
        failed_hunks: applied.iter().filter(|ok| !**ok).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use diff_match_patch_rs::PatchInput;

    fn make_patch(from: &str, to: &str) -> String {
        let dmp = DiffMatchPatch::new();
        let diffs = dmp.diff_main::<Compat>(from, to).unwrap();
        let patches = dmp.patch_make(PatchInput::new_diffs(&diffs)).unwrap();
        dmp.patch_to_text(&patches)
    }

    #[test]
    fn test_patch_applies_to_matching_text() {
        // テスト項目: 同じ元テキストから作ったパッチが適用される
        // given (前提条件):
        let before = "fn main() {\n    println!(\"hello\");\n}\n";
        let after = "fn main() {\n    println!(\"hello, world\");\n}\n";
        let patch = make_patch(before, after);

        // when (操作):
        let outcome = apply_text_patch(before, &patch).unwrap();

        // then (期待する結果):
        assert_eq!(outcome.text, after);
        assert!(outcome.fully_applied());
    }

    #[test]
    fn test_patch_handles_multibyte_characters() {
        // テスト項目: マルチバイト文字を含むテキストにもパッチが適用される
        // given (前提条件):
        let before = "// こんにちは\nlet x = 1;\n";
        let after = "// こんにちは世界\nlet x = 2;\n";
        let patch = make_patch(before, after);

        // when (操作):
        let outcome = apply_text_patch(before, &patch).unwrap();

        // then (期待する結果):
        assert_eq!(outcome.text, after);
    }

    #[test]
    fn test_unplaceable_hunk_keeps_prior_text() {
        // テスト項目: 適用できないハンクは元のテキストを維持する
        // given (前提条件):
        let patch = make_patch(
            "the quick brown fox jumps over the lazy dog",
            "the quick brown cat jumps over the lazy dog",
        );
        let unrelated = "0123456789 abcdefghij 0123456789 klmnopqrst";

        // when (操作):
        let outcome = apply_text_patch(unrelated, &patch).unwrap();

        // then (期待する結果):
        assert_eq!(outcome.text, unrelated);
        assert!(!outcome.fully_applied());
    }

    #[test]
    fn test_garbage_patch_is_format_error() {
        // テスト項目: パッチ形式でない文字列は JsonFormat エラーになる
        // given (前提条件):
        let patch = "this is not a patch";

        // when (操作):
        let result = apply_text_patch("abc", patch);

        // then (期待する結果):
        assert!(matches!(result, Err(ApiError::JsonFormat(_))));
    }
}
