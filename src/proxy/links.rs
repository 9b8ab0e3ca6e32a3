//! Launch links and display fingerprints

use crate::proxy::models::{EndpointDescriptor, Scheme};

const TELEGRAM_WEB_PREFIX: &str = "https://t.me/";
const TELEGRAM_APP_PREFIX: &str = "tg://";

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: f64 = 16_777_619.0;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Deep link that opens the endpoint in its client
///
/// Telegram web links become `tg://` links; config URIs are passed through.
pub fn launch_link(descriptor: &EndpointDescriptor) -> String {
    match descriptor.scheme {
        Scheme::TelegramProxy => {
            let line = &descriptor.raw_line;
            let has_web_prefix = line
                .get(..TELEGRAM_WEB_PREFIX.len())
                .is_some_and(|p| p.eq_ignore_ascii_case(TELEGRAM_WEB_PREFIX));
            if has_web_prefix {
                format!("{}{}", TELEGRAM_APP_PREFIX, &line[TELEGRAM_WEB_PREFIX.len()..])
            } else {
                line.clone()
            }
        }
        _ => descriptor.raw_line.clone(),
    }
}

/// Text placed on the clipboard by the copy action
pub fn copy_text(descriptor: &EndpointDescriptor) -> String {
    launch_link(descriptor)
}

/// FNV-1a style hash over UTF-16 code units, reduced to 8 decimal digits
///
/// The multiply runs in double precision on the signed 32-bit state and is
/// then wrapped to an unsigned 32-bit value. Products beyond 2^53 lose their
/// low bits, so the digits differ from an exact 32-bit FNV-1a for most
/// inputs. They match the fingerprints published alongside these feeds.
pub fn config_fingerprint(line: &str) -> String {
    let hash = line.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        let mixed = (hash as i32) ^ i32::from(unit);
        (f64::from(mixed) * FNV_PRIME).rem_euclid(TWO_POW_32) as u32
    });
    format!("{:08}", hash % 100_000_000)
}

/// Last six digits of the fingerprint, as shown next to a config
pub fn short_fingerprint(line: &str) -> String {
    let full = config_fingerprint(line);
    full[full.len() - 6..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(line: &str, scheme: Scheme) -> EndpointDescriptor {
        EndpointDescriptor::unresolved(line.to_string(), scheme)
    }

    #[test]
    fn test_telegram_link_rewritten() {
        let d = descriptor(
            "https://t.me/proxy?server=1.2.3.4&port=443&secret=abc",
            Scheme::TelegramProxy,
        );
        assert_eq!(launch_link(&d), "tg://proxy?server=1.2.3.4&port=443&secret=abc");
        assert_eq!(copy_text(&d), launch_link(&d));
    }

    #[test]
    fn test_config_links_unchanged() {
        for (line, scheme) in [
            ("vless://id@h:443?x=1#n", Scheme::Vless),
            ("vmess://e30", Scheme::Vmess),
            ("ss://abc@h:1", Scheme::Shadowsocks),
            ("trojan://p@h:1", Scheme::Trojan),
        ] {
            assert_eq!(launch_link(&descriptor(line, scheme)), line);
        }
    }

    #[test]
    fn test_fingerprint_known_values() {
        assert_eq!(config_fingerprint(""), "66136261");
        assert_eq!(config_fingerprint("a"), "26002220");
        assert_eq!(short_fingerprint("a"), "002220");
        assert_eq!(config_fingerprint("ab"), "94271946");
    }

    #[test]
    fn test_fingerprint_rounds_like_double_precision() {
        // An exact 32-bit FNV-1a would give 09308796 and 65488851 here.
        assert_eq!(config_fingerprint("vless://id@1.2.3.4:443"), "66190620");
        assert_eq!(config_fingerprint("trojan://secret@host.example:443#tag"), "08969808");
    }

    #[test]
    fn test_fingerprint_is_stable_and_padded() {
        let line = "vless://id@1.2.3.4:443";
        assert_eq!(config_fingerprint(line), config_fingerprint(line));
        assert_eq!(config_fingerprint(line).len(), 8);
        assert_ne!(config_fingerprint(line), config_fingerprint("vless://id@1.2.3.4:444"));
    }
}
