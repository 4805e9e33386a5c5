//! Best-effort platform guessing from the User-Agent header.
//!
//! Clients that know their platform pass it explicitly; everyone else gets
//! a coarse `os-arch` guess that favors the overwhelmingly common case.

/// Guesses an `os-arch` pair from a raw User-Agent value.
pub fn guess(user_agent: &str) -> String {
    let ua = user_agent.to_ascii_lowercase();
    format!("{}-{}", guess_os(&ua), guess_arch(&ua))
}

fn guess_arch(ua: &str) -> &'static str {
    if ua.contains("i386") || ua.contains("i686") {
        "386"
    } else {
        "amd64"
    }
}

fn is_darwin(ua: &str) -> bool {
    ua.contains("mac os x") || ua.contains("darwin")
}

fn guess_os(ua: &str) -> &'static str {
    if is_darwin(ua) {
        "darwin"
    } else if ua.contains("windows") {
        "windows"
    } else {
        "linux"
    }
}

#[cfg(test)]
mod tests {
    use super::guess;

    #[test]
    fn guesses_darwin_from_browser_and_curl_agents() {
        assert_eq!(
            guess("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)"),
            "darwin-amd64"
        );
        assert_eq!(guess("curl/8.4.0 (x86_64-apple-darwin23.0)"), "darwin-amd64");
    }

    #[test]
    fn guesses_windows() {
        assert_eq!(
            guess("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
            "windows-amd64"
        );
    }

    #[test]
    fn defaults_to_linux_amd64() {
        assert_eq!(guess("Wget/1.21.4"), "linux-amd64");
        assert_eq!(guess(""), "linux-amd64");
    }

    #[test]
    fn detects_32_bit_agents() {
        assert_eq!(guess("Mozilla/5.0 (X11; Linux i686)"), "linux-386");
        assert_eq!(
            guess("Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 5.1; i386)"),
            "windows-386"
        );
    }
}
