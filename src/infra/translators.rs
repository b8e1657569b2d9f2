// ============================================================
// Layer 6 — Remote Translators
// ============================================================
// Black-box translation services behind the Translator trait,
// used as baselines for the fine-tuned model:
//
//   DeepLTranslator  — POST api-free.deepl.com/v2/translate
//                      form body, "DeepL-Auth-Key <key>" header
//   OpenAiTranslator — POST api.openai.com/v1/chat/completions
//                      JSON body, bearer key, one system message
//                      that only instructs, one user message
//                      carrying the text
//
// API keys come from DEEPL_API_KEY and OPENAI_API_KEY. A
// missing key fails at construction, before any request.

use serde::{Deserialize, Serialize};

use crate::domain::errors::TranslationServiceError;
use crate::domain::traits::Translator;

pub const DEEPL_URL:        &str = "https://api-free.deepl.com/v2/translate";
pub const OPENAI_URL:       &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_GPT_MODEL: &str = "gpt-4.1-2025-04-14";

fn http_client(service: &'static str) -> Result<reqwest::blocking::Client, TranslationServiceError> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("koja-mt/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| TranslationServiceError::Request { service, message: e.to_string() })
}

fn require_key(key: Option<String>, env_var: &'static str) -> Result<String, TranslationServiceError> {
    key.filter(|k| !k.trim().is_empty())
        .ok_or(TranslationServiceError::MissingCredentials { env_var })
}

/// Short ISO-639-1 codes only ("ja", "ko", "en")
fn is_short_code(lang: &str) -> bool {
    lang.len() == 2 && lang.chars().all(|c| c.is_ascii_alphabetic())
}

// ─── DeepL ────────────────────────────────────────────────────────────────────
pub struct DeepLTranslator {
    api_key: String,
    url:     String,
    client:  reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}

impl DeepLTranslator {
    pub const SERVICE: &'static str = "deepl";
    pub const KEY_VAR: &'static str = "DEEPL_API_KEY";

    pub fn new(api_key: Option<String>) -> Result<Self, TranslationServiceError> {
        Ok(Self {
            api_key: require_key(api_key, Self::KEY_VAR)?,
            url:     DEEPL_URL.to_string(),
            client:  http_client(Self::SERVICE)?,
        })
    }

    pub fn from_env() -> Result<Self, TranslationServiceError> {
        Self::new(std::env::var(Self::KEY_VAR).ok())
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

fn parse_deepl(body: &str) -> Result<String, TranslationServiceError> {
    let invalid = |message: String| TranslationServiceError::InvalidResponse {
        service: DeepLTranslator::SERVICE,
        message,
    };
    let parsed: DeepLResponse = serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;
    parsed
        .translations
        .into_iter()
        .next()
        .map(|t| t.text)
        .ok_or_else(|| invalid("no translations in response".into()))
}

impl Translator for DeepLTranslator {
    fn name(&self) -> &str {
        Self::SERVICE
    }

    fn translate(&self, text: &str, source_lang: &str, target_lang: &str)
        -> Result<String, TranslationServiceError>
    {
        if !is_short_code(source_lang) || !is_short_code(target_lang) {
            return Err(TranslationServiceError::UnsupportedLanguagePair {
                source_lang: source_lang.to_string(),
                target_lang: target_lang.to_string(),
            });
        }
        let source = source_lang.to_ascii_uppercase();
        let target = target_lang.to_ascii_uppercase();

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&[
                ("text", text),
                ("source_lang", source.as_str()),
                ("target_lang", target.as_str()),
                ("split_sentences", "1"),
                ("preserve_formatting", "1"),
            ])
            .send()
            .map_err(|e| TranslationServiceError::Request { service: Self::SERVICE, message: e.to_string() })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TranslationServiceError::Request { service: Self::SERVICE, message: e.to_string() })?;
        if !status.is_success() {
            return Err(TranslationServiceError::Request {
                service: Self::SERVICE,
                message: format!("HTTP {status}: {body}"),
            });
        }
        parse_deepl(&body)
    }
}

// ─── OpenAI ───────────────────────────────────────────────────────────────────
pub struct OpenAiTranslator {
    api_key: String,
    model:   String,
    url:     String,
    client:  reqwest::blocking::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model:       &'a str,
    messages:    Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role:    &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

fn language_name(code: &str) -> &str {
    match code.to_ascii_lowercase().as_str() {
        "ja" => "Japanese",
        "ko" => "Korean",
        "en" => "English",
        "zh" => "Chinese",
        _    => code,
    }
}

impl OpenAiTranslator {
    pub const SERVICE: &'static str = "openai";
    pub const KEY_VAR: &'static str = "OPENAI_API_KEY";

    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, TranslationServiceError> {
        Ok(Self {
            api_key: require_key(api_key, Self::KEY_VAR)?,
            model:   model.into(),
            url:     OPENAI_URL.to_string(),
            client:  http_client(Self::SERVICE)?,
        })
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, TranslationServiceError> {
        Self::new(std::env::var(Self::KEY_VAR).ok(), model)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn request<'a>(&'a self, text: &str, source_lang: &str, target_lang: &str) -> ChatRequest<'a> {
        let instruction = format!(
            "Translate the user's {} text into natural {}. \
             Reply with the translation only, without notes or quotes.",
            language_name(source_lang),
            language_name(target_lang),
        );
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: instruction },
                ChatMessage { role: "user",   content: text.to_string() },
            ],
            temperature: 0.0,
        }
    }
}

fn parse_chat(body: &str) -> Result<String, TranslationServiceError> {
    let invalid = |message: String| TranslationServiceError::InvalidResponse {
        service: OpenAiTranslator::SERVICE,
        message,
    };
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| invalid("no message content in response".into()))
}

impl Translator for OpenAiTranslator {
    fn name(&self) -> &str {
        Self::SERVICE
    }

    fn translate(&self, text: &str, source_lang: &str, target_lang: &str)
        -> Result<String, TranslationServiceError>
    {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.request(text, source_lang, target_lang))
            .send()
            .map_err(|e| TranslationServiceError::Request { service: Self::SERVICE, message: e.to_string() })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TranslationServiceError::Request { service: Self::SERVICE, message: e.to_string() })?;
        if !status.is_success() {
            return Err(TranslationServiceError::Request {
                service: Self::SERVICE,
                message: format!("HTTP {status}: {body}"),
            });
        }
        parse_chat(&body)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_fail_before_any_request() {
        let err = DeepLTranslator::new(None).err().unwrap();
        assert!(matches!(err, TranslationServiceError::MissingCredentials { env_var: "DEEPL_API_KEY" }));

        let err = OpenAiTranslator::new(Some("  ".into()), DEFAULT_GPT_MODEL).err().unwrap();
        assert!(matches!(err, TranslationServiceError::MissingCredentials { env_var: "OPENAI_API_KEY" }));
    }

    #[test]
    fn test_parse_deepl_response() {
        let body = r#"{"translations":[{"detected_source_language":"JA","text":"고양이를 좋아해요"}]}"#;
        assert_eq!(parse_deepl(body).unwrap(), "고양이를 좋아해요");

        let err = parse_deepl(r#"{"translations":[]}"#).unwrap_err();
        assert!(matches!(err, TranslationServiceError::InvalidResponse { .. }));
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":" 감사합니다\n"}}]}"#;
        assert_eq!(parse_chat(body).unwrap(), "감사합니다");

        let err = parse_chat(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#).unwrap_err();
        assert!(matches!(err, TranslationServiceError::InvalidResponse { .. }));
    }

    #[test]
    fn test_chat_request_keeps_text_out_of_system_prompt() {
        let gpt = OpenAiTranslator::new(Some("sk-test".into()), "gpt-test").unwrap();
        let req = gpt.request("猫が好きです", "ja", "ko");
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["model"], "gpt-test");
        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json["messages"][0]["content"].as_str().unwrap().contains("Japanese"));
        assert!(!json["messages"][0]["content"].as_str().unwrap().contains("猫"));
        assert_eq!(json["messages"][1]["content"], "猫が好きです");
    }

    #[test]
    fn test_deepl_rejects_model_tags() {
        let deepl = DeepLTranslator::new(Some("key".into())).unwrap();
        let err = deepl.translate("猫", "jpn_Jpan", "kor_Hang").unwrap_err();
        assert!(matches!(err, TranslationServiceError::UnsupportedLanguagePair { .. }));
    }

    #[test]
    fn test_unreachable_service_is_request_error() {
        let deepl = DeepLTranslator::new(Some("key".into())).unwrap().with_url("http://127.0.0.1:9/v2/translate");
        let err = deepl.translate("猫", "ja", "ko").unwrap_err();
        assert!(matches!(err, TranslationServiceError::Request { service: "deepl", .. }));
    }
}
