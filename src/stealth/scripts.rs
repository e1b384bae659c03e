//! Mobile emulation and anti-automation payloads
//!
//! Installed with Page.addScriptToEvaluateOnNewDocument before navigation
//! so they run ahead of any page script.

/// iPhone Safari user agent presented to every page
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

/// Hide the automation fingerprints detection scripts probe for
pub const ANTI_AUTOMATION_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', {
    get: () => undefined,
});

window.chrome = window.chrome || {};
window.chrome.runtime = window.chrome.runtime || {};

Object.defineProperty(navigator, 'plugins', {
    get: () => [1, 2, 3, 4, 5],
});

Object.defineProperty(navigator, 'languages', {
    get: () => ['zh-CN', 'zh', 'en'],
});

const originalQuery = window.navigator.permissions.query;
window.navigator.permissions.query = (parameters) => (
    parameters.name === 'notifications'
        ? Promise.resolve({ state: Notification.permission })
        : originalQuery(parameters)
);
"#;

/// Present touch-device characteristics consistent with the viewport override
pub const MOBILE_EMULATION_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'maxTouchPoints', {
    get: () => 5,
});

Object.defineProperty(navigator, 'platform', {
    get: () => 'iPhone',
});

Object.defineProperty(screen, 'orientation', {
    get: () => ({ type: 'portrait-primary', angle: 0 }),
});

Object.defineProperty(navigator, 'connection', {
    get: () => ({ effectiveType: '4g', rtt: 50, downlink: 10 }),
});

if (!document.querySelector('meta[name="viewport"]')) {
    const meta = document.createElement('meta');
    meta.name = 'viewport';
    meta.content = 'width=device-width, initial-scale=1.0';
    document.addEventListener('DOMContentLoaded', () => {
        document.head.appendChild(meta);
    });
}
"#;

/// Extra HTTP headers sent with every request
pub fn mobile_headers() -> serde_json::Value {
    serde_json::json!({
        "Accept": "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        "Accept-Language": "zh-CN,zh;q=0.9,en;q=0.8",
        "Accept-Encoding": "gzip, deflate, br",
        "Upgrade-Insecure-Requests": "1",
        "Sec-Fetch-Dest": "document",
        "Sec-Fetch-Mode": "navigate",
        "Sec-Fetch-Site": "none",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_is_mobile_safari() {
        assert!(MOBILE_USER_AGENT.contains("iPhone"));
        assert!(MOBILE_USER_AGENT.contains("Safari"));
    }

    #[test]
    fn test_anti_automation_masks_webdriver() {
        assert!(ANTI_AUTOMATION_SCRIPT.contains("'webdriver'"));
        assert!(ANTI_AUTOMATION_SCRIPT.contains("undefined"));
    }

    #[test]
    fn test_headers_prefer_chinese_locale() {
        let headers = mobile_headers();
        let lang = headers["Accept-Language"].as_str().unwrap();
        assert!(lang.starts_with("zh-CN"));
    }
}
