//! User input validation
//!
//! A message is only worth resolving if it carries an http(s) link.

use lazy_regex::regex_find;
use url::Url;

/// Characters that usually end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '>', '"', '\''];

/// Extracts the first http(s) URL from free-form message text.
///
/// Returns `None` when the text has no `http` link, in which case no
/// resolution must be attempted.
///
/// # Examples
/// ```
/// use vidrelay::core::validation::extract_url;
///
/// assert_eq!(
///     extract_url("check this https://tiktok.com/@x/video/123").as_deref(),
///     Some("https://tiktok.com/@x/video/123")
/// );
/// assert_eq!(extract_url("no link here"), None);
/// ```
pub fn extract_url(text: &str) -> Option<String> {
    let candidate = regex_find!(r"(?i)https?://\S+", text)?;
    let candidate = trim_trailing_punctuation(candidate);

    let parsed = Url::parse(candidate).ok()?;
    parsed.host_str()?;
    Some(candidate.to_string())
}

/// Strips sentence punctuation from the end of `candidate`.
///
/// A closing `)` or `]` stays when the URL itself opened it, as in
/// `https://en.wikipedia.org/wiki/Foo_(bar)`.
fn trim_trailing_punctuation(mut candidate: &str) -> &str {
    while let Some(last) = candidate.chars().last() {
        if !TRAILING_PUNCTUATION.contains(&last) {
            break;
        }
        let opener = match last {
            ')' => Some('('),
            ']' => Some('['),
            _ => None,
        };
        if let Some(opener) = opener {
            let opened = candidate.matches(opener).count();
            let closed = candidate.matches(last).count();
            if closed <= opened {
                break;
            }
        }
        candidate = &candidate[..candidate.len() - last.len_utf8()];
    }
    candidate
}
