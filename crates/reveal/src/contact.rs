use shared::domain::handle_digits;
use url::{form_urlencoded, Url};

/// Builds the outbound link shown on the final stage.
pub trait ContactLinkBuilder: Send + Sync {
    fn build(&self, handle: &str, sender_name: &str) -> String;
}

/// Click-to-chat style links: `<base><digits>?text=<template>`.
#[derive(Debug, Clone)]
pub struct MessagingLinkBuilder {
    base: String,
    template: String,
}

impl MessagingLinkBuilder {
    pub const DEFAULT_BASE: &'static str = "https://wa.me/";
    /// `{sender}` is replaced with the sender's name.
    pub const DEFAULT_TEMPLATE: &'static str = "Hi {sender}! I said YES! 💖";

    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base)?.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            base,
            template: Self::DEFAULT_TEMPLATE.to_string(),
        })
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    fn text_for(&self, sender_name: &str) -> String {
        self.template.replace("{sender}", sender_name)
    }
}

impl Default for MessagingLinkBuilder {
    fn default() -> Self {
        Self {
            base: Self::DEFAULT_BASE.to_string(),
            template: Self::DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl ContactLinkBuilder for MessagingLinkBuilder {
    fn build(&self, handle: &str, sender_name: &str) -> String {
        let text: String =
            form_urlencoded::byte_serialize(self.text_for(sender_name).as_bytes()).collect();
        format!("{}{}?text={text}", self.base, handle_digits(handle))
    }
}
