//! Intent router
//!
//! Classifies a normalized utterance into a local shortcut reply or a remote
//! dispatch. Categories are checked in a fixed priority order and the first
//! match wins, so "contact me about products" is a contact request.
//!
//! Matching is a case-insensitive substring test against fixed keyword sets.
//! It is deliberately coarse ("this" contains "hi"); the keyword sets and the
//! priority order are the contract.

pub const GREETING_KEYWORDS: &[&str] = &[
    "hello",
    "hey",
    "hi",
    "how are you",
    "good morning",
    "good afternoon",
    "good evening",
];

pub const CONTACT_KEYWORDS: &[&str] = &["contact", "email", "phone", "company", "address"];

pub const CATALOG_KEYWORDS: &[&str] = &["product", "products", "category", "categories"];

pub const GREETING_REPLY: &str = "Hello! 👋 How can I help you today?";

pub const CATALOG_REPLY: &str =
    "Let me show you our products! Taking you to the catalog in a moment... 🛍️";

pub const APOLOGY_REPLY: &str =
    "Sorry, I'm having trouble connecting right now. Please try again in a moment.";

/// Static contact details used for the contact-info shortcut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInfo {
    pub phone: String,
    pub email: String,
    pub address: String,
}

/// Classification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    ContactInfo,
    ProductCatalog,
    Remote,
}

/// Reply produced without contacting the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalReply {
    pub text: String,
    pub redirect: Option<String>,
}

/// Routing decision for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Local { intent: Intent, reply: LocalReply },
    Remote { message: String },
}

/// Classify a trimmed utterance by keyword priority
pub fn classify(utterance: &str) -> Intent {
    let lowered = utterance.to_lowercase();
    let matches_any = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    if matches_any(GREETING_KEYWORDS) {
        Intent::Greeting
    } else if matches_any(CONTACT_KEYWORDS) {
        Intent::ContactInfo
    } else if matches_any(CATALOG_KEYWORDS) {
        Intent::ProductCatalog
    } else {
        Intent::Remote
    }
}

/// Router with the static data needed to build local replies
#[derive(Debug, Clone)]
pub struct IntentRouter {
    contact: ContactInfo,
    catalog_path: String,
}

impl IntentRouter {
    pub fn new(contact: ContactInfo, catalog_path: impl Into<String>) -> Self {
        Self {
            contact,
            catalog_path: catalog_path.into(),
        }
    }

    /// Route a trimmed, non-empty utterance
    pub fn route(&self, utterance: &str) -> Route {
        let intent = classify(utterance);
        let reply = match intent {
            Intent::Greeting => LocalReply {
                text: GREETING_REPLY.to_string(),
                redirect: None,
            },
            Intent::ContactInfo => LocalReply {
                text: self.contact_reply(),
                redirect: None,
            },
            Intent::ProductCatalog => LocalReply {
                text: CATALOG_REPLY.to_string(),
                redirect: Some(self.catalog_path.clone()),
            },
            Intent::Remote => {
                return Route::Remote {
                    message: utterance.to_string(),
                }
            }
        };
        tracing::debug!(intent = ?intent, "Answered locally");
        Route::Local { intent, reply }
    }

    fn contact_reply(&self) -> String {
        format!(
            "You can reach us here:\n📞 Phone: {}\n📧 Email: {}\n📍 Address: {}",
            self.contact.phone, self.contact.email, self.contact.address
        )
    }
}

/// The two assistant turns shown the first time the widget opens
pub fn welcome_messages(company_name: &str) -> [String; 2] {
    [
        format!("Hi there! 👋 Welcome to {company_name}."),
        "I can share our contact details, show you our products, or answer your questions. \
         What would you like to know?"
            .to_string(),
    ]
}
