// src/responder.rs
//! Reply generation for the assistant side of a conversation.
//!
//! [`KeywordResponder`] is the built-in placeholder: it classifies the prompt
//! into a topic by keyword and answers with a fixed Markdown template after an
//! artificial delay. [`HttpResponder`] forwards the prompt to an external
//! service with the same contract.

use crate::error::ResponderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, prompt: &str) -> Result<String, ResponderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    WomensSafety,
    WelfareSchemes,
    LegalRights,
    General,
}

// Checked in order; the first group with a match wins.
const TOPIC_KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::WomensSafety, &["women", "safety", "பெண்"]),
    (Topic::WelfareSchemes, &["scheme", "welfare", "திட்டம்"]),
    (Topic::LegalRights, &["law", "legal", "right", "சட்டம்"]),
];

impl Topic {
    pub fn classify(prompt: &str) -> Topic {
        let lower = prompt.to_lowercase();
        TOPIC_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(topic, _)| *topic)
            .unwrap_or(Topic::General)
    }

    pub fn reply(self) -> &'static str {
        match self {
            Topic::WomensSafety => WOMENS_SAFETY_REPLY,
            Topic::WelfareSchemes => WELFARE_SCHEMES_REPLY,
            Topic::LegalRights => LEGAL_RIGHTS_REPLY,
            Topic::General => GENERAL_REPLY,
        }
    }
}

/// Deterministic core of the keyword responder.
pub fn generate_response(prompt: &str) -> &'static str {
    Topic::classify(prompt).reply()
}

#[derive(Debug, Clone)]
pub struct KeywordResponder {
    delay: Duration,
}

impl KeywordResponder {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for KeywordResponder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl Responder for KeywordResponder {
    async fn respond(&self, prompt: &str) -> Result<String, ResponderError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let topic = Topic::classify(prompt);
        tracing::debug!(?topic, "keyword responder matched");
        Ok(topic.reply().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ReplyRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReplyBody {
    response: String,
}

/// Sends `{"prompt": ...}` to an assistant service and expects `{"response": ...}` back.
#[derive(Debug, Clone)]
pub struct HttpResponder {
    client: Client,
    url: String,
}

impl HttpResponder {
    pub fn new(url: impl Into<String>) -> Result<Self, ResponderError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn respond(&self, prompt: &str) -> Result<String, ResponderError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ReplyRequest { prompt })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Responder at {} returned {}", self.url, status);
            return Err(ResponderError::Status(status.as_u16()));
        }

        let body: ReplyBody = response.json().await?;
        if body.response.trim().is_empty() {
            return Err(ResponderError::EmptyReply);
        }
        Ok(body.response)
    }
}

pub const WOMENS_SAFETY_REPLY: &str = "**Women's Safety Resources in Tamil Nadu**

Here are key resources and rights you should know:

1. **Emergency Helpline**: Call **181** (Women Helpline) available 24/7
2. **Police Emergency**: **100** or **112**

**Your Legal Rights:**
- **Domestic Violence Act**: Protection from physical, emotional, and economic abuse
- **Sexual Harassment at Workplace Act**: Every employer must have an Internal Complaints Committee
- **Free Legal Aid**: Available at District Legal Services Authority

**Key Schemes:**
- **Moovalur Ramamirtham Scheme**: Financial assistance for girls' education
- **Marriage Assistance Scheme**: ₹50,000 for eligible women

Would you like more details on any specific topic?";

pub const WELFARE_SCHEMES_REPLY: &str = "**Tamil Nadu Welfare Schemes**

Here are some key government schemes you may be eligible for:

**For Students:**
- **Free Bus Pass**: For school and college students
- **Laptop Scheme**: Free laptops for +2 and college students

**For Families:**
- **Kalaignar Health Insurance**: Up to ₹5 lakh medical coverage
- **Amma Unavagam**: Subsidized meals at ₹5

**For Farmers:**
- **Crop Insurance Scheme**: Protection against crop failure
- **Free Electricity**: For agricultural pump sets

**Eligibility Criteria:**
- Most schemes require a **Family Card** (Ration Card)
- Income limits apply for some schemes
- Valid **Aadhaar** documentation needed

Shall I explain the application process for any specific scheme?";

pub const LEGAL_RIGHTS_REPLY: &str = "**Understanding Your Legal Rights**

Every citizen has fundamental rights under the Indian Constitution:

**Key Rights:**
- **Right to Equality** (Article 14-18)
- **Right to Freedom** (Article 19-22)
- **Right against Exploitation** (Article 23-24)
- **Right to Constitutional Remedies** (Article 32)

**Free Legal Help:**
- **District Legal Services Authority**: Free legal aid for eligible citizens
- **Lok Adalat**: Quick dispute resolution without court fees
- **Legal Aid Clinic**: Available in every Taluk

**How to File a Complaint:**
1. Visit your nearest **Police Station**
2. File at **e-Sevai Center** for certain matters
3. Approach **Consumer Forum** for consumer issues

What specific legal matter would you like guidance on?";

pub const GENERAL_REPLY: &str = "Thank you for your question. I'm here to help you understand:

- **Legal Rights**: Your constitutional and statutory rights
- **Women's Safety**: Emergency contacts, laws, and support services
- **Welfare Schemes**: Government benefits you may be eligible for

Please ask about any specific topic, and I'll provide detailed information in English or Tamil.

**Quick Tips:**
- Use the 🎤 microphone button to speak your question
- You can ask in Tamil or English
- Be specific for more accurate information";
