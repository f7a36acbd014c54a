/// 認証情報をマスキングしてログ出力用の文字列を生成
///
/// 最初の4文字と最後の4文字のみを表示し、中間を***でマスキング
///
/// # Examples
/// ```
/// use livestreams_lib::util::mask_secret;
///
/// let masked = mask_secret("abcd1234efgh5678");
/// assert_eq!(masked, "abcd***5678");
/// ```
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let len = chars.len();
    if len <= 8 {
        // 短い値は全体をマスク
        return "***".to_string();
    }

    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[len - 4..].iter().collect();
    format!("{}***{}", prefix, suffix)
}
