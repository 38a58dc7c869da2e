/*!
 * Tests for language code utilities
 */

use cuegate::language_utils::{
    get_language_name, normalize_to_part1_or_part2t, normalize_to_part2t, validate_language_code,
};

/// Test normalization across code forms
#[test]
fn test_normalizeToPart2t_withAllForms_shouldReturnTerminologyCode() {
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("fra").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t(" HE ").unwrap(), "heb");
}

#[test]
fn test_normalizeToPart1OrPart2t_shouldPreferTwoLetterCode() {
    assert_eq!(normalize_to_part1_or_part2t("deu").unwrap(), "de");
    assert_eq!(normalize_to_part1_or_part2t("ger").unwrap(), "de");
    assert_eq!(normalize_to_part1_or_part2t("en-GB").unwrap(), "en");
}

#[test]
fn test_normalize_withInvalidCode_shouldFail() {
    assert!(normalize_to_part2t("qq").is_err());
    assert!(normalize_to_part1_or_part2t("toolong").is_err());
}

#[test]
fn test_getLanguageName_withVariousCodes_shouldAgree() {
    for code in ["es", "spa", "es-MX"] {
        assert_eq!(get_language_name(code).unwrap(), "Spanish", "code {code}");
    }
    assert!(get_language_name("zz").is_err());
}

#[test]
fn test_validateLanguageCode_withUnderscoreRegion_shouldSucceed() {
    assert!(validate_language_code("pt_BR").is_ok());
    assert!(validate_language_code("-BR").is_err());
}
