//! Delivery channels, render formats and the data mapping handed to templates.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CourierError;

/// Template execution data: a flat mapping of names to JSON values.
pub type MessageData = HashMap<String, serde_json::Value>;

/// Delivery medium a message can be sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Mail,
    Sms,
    Push,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Mail, Channel::Sms, Channel::Push];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Mail => "mail",
            Channel::Sms => "sms",
            Channel::Push => "push",
        }
    }

    /// Formats the channel's body is rendered in, in render order.
    pub fn formats(&self) -> &'static [RenderFormat] {
        match self {
            Channel::Mail => &[RenderFormat::Html, RenderFormat::Text],
            Channel::Sms | Channel::Push => &[RenderFormat::Text],
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mail" | "email" => Ok(Channel::Mail),
            "sms" => Ok(Channel::Sms),
            "push" => Ok(Channel::Push),
            _ => Err(CourierError::UnknownChannel(s.to_string())),
        }
    }
}

/// Output format of a rendered template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    Text,
    Html,
}

impl RenderFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderFormat::Text => "text",
            RenderFormat::Html => "html",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderFormat {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(RenderFormat::Text),
            "html" => Ok(RenderFormat::Html),
            _ => Err(CourierError::UnknownFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_round_trips_through_display() {
        for channel in Channel::ALL {
            assert_eq!(channel.to_string().parse::<Channel>().unwrap(), channel);
        }
    }

    #[test]
    fn channel_parse_accepts_email_alias() {
        assert_eq!("Email".parse::<Channel>().unwrap(), Channel::Mail);
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let err = "fax".parse::<Channel>().unwrap_err();
        assert_eq!(err, CourierError::UnknownChannel("fax".to_string()));
    }

    #[test]
    fn mail_renders_html_before_text() {
        assert_eq!(Channel::Mail.formats(), &[RenderFormat::Html, RenderFormat::Text]);
        assert_eq!(Channel::Sms.formats(), &[RenderFormat::Text]);
    }

    #[test]
    fn format_rejects_unknown_tag() {
        assert!("markdown".parse::<RenderFormat>().is_err());
        assert_eq!("html".parse::<RenderFormat>().unwrap(), RenderFormat::Html);
    }
}
