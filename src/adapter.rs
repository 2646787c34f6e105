//! Per-type unread-count extraction.
//!
//! The injected probe only collects raw page facts (the document title and
//! the content of one indicator element); turning those into a count happens
//! here, one adapter per supported service type.

/// DOM element the probe should read for a service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub selector: &'static str,
    /// Read this attribute instead of the element's text.
    pub attribute: Option<&'static str>,
}

/// Raw facts reported by the probe for one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub title: String,
    /// Content of the adapter's indicator, `None` when the element is absent.
    pub indicator: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Count(u32),
    /// The page carries no recognizable unread signal right now.
    NoIndicator,
}

pub trait ServiceAdapter: Send + Sync {
    fn service_type(&self) -> &str;

    /// Element the injected probe should read, if any.
    fn indicator(&self) -> Option<Indicator> {
        None
    }

    fn probe(&self, page: &PageSnapshot) -> ProbeOutcome;

    /// Whether the view should be polled for unread messages at all.
    fn polls_unread(&self) -> bool {
        true
    }

    /// Whether `http`/`https` popups go to the default browser.
    fn opens_links_externally(&self) -> bool {
        true
    }
}

/// Digits of `text` concatenated, e.g. "Inbox 12 unread" -> 12.
///
/// No digits at all reads as zero, which is how an empty label behaves.
pub fn digits_of(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}

/// First "(N)" group in a window title, e.g. "(3) WhatsApp" -> 3.
pub fn parenthesized_count(title: &str) -> Option<u32> {
    let mut rest = title;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        if let Some(close) = after.find(')') {
            let inner = after[..close].trim();
            if let Ok(count) = inner.parse::<u32>() {
                return Some(count);
            }
            rest = &after[close + 1..];
        } else {
            break;
        }
    }
    None
}

/// Gmail puts the inbox count into the aria-label of the inbox link.
pub struct GoogleMail;

impl ServiceAdapter for GoogleMail {
    fn service_type(&self) -> &str {
        "googleMail"
    }

    fn indicator(&self) -> Option<Indicator> {
        Some(Indicator {
            selector: ".aim .aio span a",
            attribute: Some("aria-label"),
        })
    }

    fn probe(&self, page: &PageSnapshot) -> ProbeOutcome {
        match page.indicator.as_deref().and_then(digits_of) {
            Some(count) => ProbeOutcome::Count(count),
            None => ProbeOutcome::NoIndicator,
        }
    }
}

/// Slack marks unread activity by prefixing the title with `*` or `!`.
pub struct Slack;

impl ServiceAdapter for Slack {
    fn service_type(&self) -> &str {
        "slack"
    }

    fn probe(&self, page: &PageSnapshot) -> ProbeOutcome {
        if let Some(count) = parenthesized_count(&page.title) {
            return ProbeOutcome::Count(count);
        }
        match page.title.trim_start().chars().next() {
            Some('*') | Some('!') => ProbeOutcome::Count(1),
            Some(_) => ProbeOutcome::Count(0),
            None => ProbeOutcome::NoIndicator,
        }
    }
}

/// Threema shows a badge element per unread conversation.
pub struct Threema;

impl ServiceAdapter for Threema {
    fn service_type(&self) -> &str {
        "threema"
    }

    fn indicator(&self) -> Option<Indicator> {
        Some(Indicator {
            selector: ".unread-count",
            attribute: None,
        })
    }

    fn probe(&self, page: &PageSnapshot) -> ProbeOutcome {
        match page.indicator.as_deref() {
            Some(text) => digits_of(text).map_or(ProbeOutcome::NoIndicator, ProbeOutcome::Count),
            // no badge element means nothing unread once the page has a title
            None if !page.title.is_empty() => ProbeOutcome::Count(0),
            None => ProbeOutcome::NoIndicator,
        }
    }

    fn opens_links_externally(&self) -> bool {
        false
    }
}

/// IRC webchat: no unread signal, links only.
pub struct Freenode;

impl ServiceAdapter for Freenode {
    fn service_type(&self) -> &str {
        "freenode"
    }

    fn probe(&self, _page: &PageSnapshot) -> ProbeOutcome {
        ProbeOutcome::NoIndicator
    }

    fn polls_unread(&self) -> bool {
        false
    }
}

/// Services that publish "(N)" in their document title.
pub struct TitleCounter {
    service_type: &'static str,
    external_links: bool,
}

impl TitleCounter {
    pub const fn new(service_type: &'static str, external_links: bool) -> Self {
        TitleCounter {
            service_type,
            external_links,
        }
    }
}

impl ServiceAdapter for TitleCounter {
    fn service_type(&self) -> &str {
        self.service_type
    }

    fn probe(&self, page: &PageSnapshot) -> ProbeOutcome {
        if page.title.is_empty() {
            return ProbeOutcome::NoIndicator;
        }
        ProbeOutcome::Count(parenthesized_count(&page.title).unwrap_or(0))
    }

    fn opens_links_externally(&self) -> bool {
        self.external_links
    }
}

static GOOGLE_MAIL: GoogleMail = GoogleMail;
static SLACK: Slack = Slack;
static THREEMA: Threema = Threema;
static FREENODE: Freenode = Freenode;
static GOOGLE_MESSAGES: TitleCounter = TitleCounter::new("googleMessages", true);
static MATTERMOST: TitleCounter = TitleCounter::new("mattermost", true);
static TELEGRAM: TitleCounter = TitleCounter::new("telegram", true);
static TWITTER: TitleCounter = TitleCounter::new("twitter", false);
static WHATSAPP: TitleCounter = TitleCounter::new("whatsapp", true);
static XING: TitleCounter = TitleCounter::new("xing", false);
static GENERIC: TitleCounter = TitleCounter::new("generic", true);

/// Adapter for a service type; unknown types fall back to title counting.
pub fn adapter_for(service_type: &str) -> &'static dyn ServiceAdapter {
    match service_type {
        "googleMail" => &GOOGLE_MAIL,
        "slack" => &SLACK,
        "threema" => &THREEMA,
        "freenode" => &FREENODE,
        "googleMessages" => &GOOGLE_MESSAGES,
        "mattermost" => &MATTERMOST,
        "telegram" => &TELEGRAM,
        "twitter" => &TWITTER,
        "whatsapp" => &WHATSAPP,
        "xing" => &XING,
        other => {
            tracing::debug!(service_type = other, "No dedicated adapter, using title counter");
            &GENERIC
        }
    }
}
