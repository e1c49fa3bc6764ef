//! Markers, class names and default values shared across the pipeline.

use std::time::Duration;

/// Attribute mirroring a container's render state.
pub const RENDER_STATE_ATTRIBUTE: &str = "data-mermaid-rendered";

/// Class of the card that holds a rendered diagram.
pub const WRAPPER_CLASS: &str = "mermaid-diagram-container";

/// Class of the mount point handed to the rendering library.
pub const MOUNT_CLASS: &str = "mermaid";

/// Prefix of generated mount point ids.
pub const MOUNT_ID_PREFIX: &str = "mermaid-";

/// Class of the show/hide source button.
pub const TOGGLE_CLASS: &str = "mermaid-toggle";

/// Class of the inline notice shown for a failed block.
pub const ERROR_NOTICE_CLASS: &str = "mermaid-error-notice";

/// Toggle label while the source is hidden.
pub const SHOW_CODE_LABEL: &str = "Show Code";

/// Toggle label while the source is visible.
pub const HIDE_CODE_LABEL: &str = "Hide Code";

/// Prefix of the error notice text.
pub const ERROR_NOTICE_PREFIX: &str = "Error rendering Mermaid diagram: ";

pub const WRAPPER_STYLE: &str = "background: white; padding: 20px; border-radius: 8px; \
     margin: 10px 0; box-shadow: 0 2px 8px rgba(0,0,0,0.1); overflow-x: auto; position: relative;";

pub const TOGGLE_STYLE: &str = "position: absolute; top: 10px; right: 10px; padding: 6px 12px; \
     background: #0052CC; color: white; border: none; border-radius: 4px; cursor: pointer; \
     font-size: 12px; z-index: 10;";

pub const ERROR_NOTICE_STYLE: &str = "background: #FFEBE6; border: 1px solid #FF5630; \
     color: #DE350B; padding: 12px; border-radius: 4px; margin: 10px 0;";

/// Default HTTP timeout for Kroki requests, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

/// Default diagram theme.
pub const DEFAULT_THEME: &str = "default";

/// Default diagram font stack.
pub const DEFAULT_FONT_FAMILY: &str = r#"ui-sans-serif, -apple-system, BlinkMacSystemFont, "Segoe UI", Ubuntu, "Helvetica Neue", sans-serif"#;

/// Code elements that may hold diagram source.
pub const DEFAULT_CODE_SELECTORS: &[&str] = &[
    "code.language-text",
    r#"code[class*="language-"]"#,
    "pre code",
];

/// Container selectors in priority order.
pub const DEFAULT_CONTAINER_SELECTORS: &[&str] = &[".code-block", "pre"];

/// Elements whose appearance in added content warrants a re-scan: every code
/// and container pattern the scanner recognizes.
pub const DEFAULT_WATCH_SELECTORS: &[&str] = &[
    "code.language-text",
    r#"code[class*="language-"]"#,
    "pre code",
    ".code-block",
    "pre",
];

/// Default quiet period before a mutation-triggered re-scan, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(DEFAULT_DEBOUNCE_MS);
