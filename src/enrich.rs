//! # Text Enrichment Module
//!
//! Turns a free-text product description into a complete [`ProductDraft`]
//! by gathering web evidence, asking text providers for a strict JSON
//! record in a fixed order, and normalizing whatever comes back.
//!
//! ## Pipeline
//!
//! 1. Sanitize the operator's text and derive name/plan priors
//! 2. Gather evidence for the guessed name and append website content
//! 3. Run the providers in order with per-provider retries
//! 4. Coerce the answer into the draft schema, or build a heuristic
//!    record when every provider failed
//! 5. Optionally run a second, detail-focused request when the
//!    description or feature list came back thin
//!
//! [`Enricher::enrich_with_ai`] never fails; the worst case is the
//! heuristic record.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, EnrichLimits, RetryPolicy};
use crate::evidence::{EvidenceSource, WebSearchAggregator};
use crate::fallback::{select_by_name, try_in_order};
use crate::product::{is_known, Category, ProductDraft, MAX_FEATURES, UNKNOWN};
use crate::providers::{build_text_providers, TextProvider};
use crate::text_processing::{
    guess_name, guess_plan, parse_price, price_from_value, sanitize_text, truncate_chars,
    uniq_merge, value_to_list,
};

/// Keys every model answer must contain
pub const DRAFT_KEYS: [&str; 9] = [
    "name",
    "plan",
    "validity",
    "price",
    "description",
    "tags",
    "category",
    "subcategory",
    "features",
];

const SYSTEM_PROMPT: &str = "You extract product catalog records for a digital-subscription store. \
Answer with a single JSON object and nothing else. The object must have exactly these keys: \
name, plan, validity, price, description, tags, category, subcategory, features. \
price is a number or \"unknown\". tags and features are arrays of strings. \
category must be one of: \"OTT Accounts\", \"IPTV\", \"Product Key\", \"Download\". \
Use the literal string \"unknown\" for anything you cannot determine. Never invent facts.";

const DETAIL_SYSTEM_PROMPT: &str = "You write concise, factual product copy. \
Answer with a single JSON object with exactly two keys: description (a string of 2 to 3 \
sentences) and features (an array of 5 short phrases). Use only facts present in the evidence.";

/// Name and plan derived from the operator's text before any model call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Priors {
    pub name: String,
    pub plan: String,
}

impl Priors {
    pub fn from_text(sanitized: &str) -> Self {
        Self {
            name: guess_name(sanitized),
            plan: guess_plan(sanitized),
        }
    }
}

/// Build the extraction prompt embedding the operator's raw text and the
/// evidence
pub fn build_user_prompt(user_text: &str, evidence: &str, priors: &Priors) -> String {
    let mut prompt = String::new();
    prompt.push_str("OPERATOR TEXT (fields stated here always win over evidence):\n");
    prompt.push_str(user_text);
    prompt.push_str("\n\n");
    if !priors.name.is_empty() {
        prompt.push_str(&format!("Likely product name: {}\n", priors.name));
    }
    if !priors.plan.is_empty() {
        prompt.push_str(&format!("Likely plan: {}\n", priors.plan));
    }
    prompt.push_str(
        "\nRULES:\n\
         - description: 1 to 3 factual sentences about what the product offers.\n\
         - features: 4 to 6 short phrases, each grounded in the evidence.\n\
         - category: exactly one of \"OTT Accounts\", \"IPTV\", \"Product Key\", \"Download\".\n\
         - subcategory: a short free-form label such as \"Music\" or \"Design\".\n\
         - Write \"unknown\" for any field you cannot determine.\n",
    );
    prompt.push_str("\nEVIDENCE:\n");
    if evidence.trim().is_empty() {
        prompt.push_str("(none)\n");
    } else {
        prompt.push_str(evidence);
        prompt.push('\n');
    }
    prompt
}

fn build_detail_prompt(draft: &ProductDraft, evidence: &str) -> String {
    format!(
        "PRODUCT: {} ({})\nCURRENT DESCRIPTION: {}\n\nEVIDENCE:\n{}\n",
        draft.name, draft.plan, draft.description, evidence
    )
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn known_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    string_field(object, key).filter(|value| is_known(value))
}

fn prior_or_unknown(prior: &str) -> String {
    if prior.is_empty() {
        UNKNOWN.to_string()
    } else {
        prior.to_string()
    }
}

/// Coerce a model answer into a draft.
///
/// Missing name and plan fall back to the priors, price goes through the
/// numeric extractor, list fields accept arrays or separated strings, and
/// the category is re-validated against the closed set.
pub fn normalize_model_output(object: &Map<String, Value>, priors: &Priors) -> ProductDraft {
    let name = known_field(object, "name").unwrap_or_else(|| prior_or_unknown(&priors.name));
    let mut draft = ProductDraft::new(name);

    draft.plan = known_field(object, "plan").unwrap_or_else(|| prior_or_unknown(&priors.plan));
    draft.validity = known_field(object, "validity").unwrap_or_else(|| UNKNOWN.to_string());
    draft.price = object.get("price").and_then(price_from_value);
    draft.description = known_field(object, "description").unwrap_or_default();
    draft.subcategory = known_field(object, "subcategory").unwrap_or_else(|| UNKNOWN.to_string());

    let tags = object.get("tags").map(value_to_list).unwrap_or_default();
    draft.tags = uniq_merge(&tags, &[])
        .into_iter()
        .filter(|tag| is_known(tag))
        .collect();

    draft.features = object
        .get("features")
        .map(value_to_list)
        .unwrap_or_default()
        .into_iter()
        .filter(|feature| is_known(feature))
        .take(MAX_FEATURES)
        .collect();

    let candidate = string_field(object, "category");
    draft.category = Category::infer(candidate.as_deref(), &draft.category_context());
    draft
}

/// Heuristic record used when every provider failed
pub fn degraded_record(sanitized: &str, priors: &Priors) -> ProductDraft {
    let name = prior_or_unknown(&priors.name);
    let mut draft = ProductDraft::new(name.clone());
    draft.plan = prior_or_unknown(&priors.plan);
    draft.description = name;
    draft.price = parse_price(sanitized);
    draft.category = Category::infer(None, sanitized);
    draft
}

/// Merge a detail answer, only replacing content that got longer
fn merge_details(draft: &mut ProductDraft, details: &Map<String, Value>) {
    if let Some(description) = known_field(details, "description") {
        if description.chars().count() > draft.description.chars().count() {
            draft.description = description;
        }
    }
    let listed = details.get("features").map(value_to_list).unwrap_or_default();
    let features: Vec<String> = uniq_merge(&listed, &[])
        .into_iter()
        .filter(|feature| is_known(feature))
        .take(MAX_FEATURES)
        .collect();
    if features.len() > draft.features.len() {
        draft.features = features;
    }
}

/// The text enrichment orchestrator
pub struct Enricher {
    providers: Vec<Arc<dyn TextProvider>>,
    evidence: Arc<dyn EvidenceSource>,
    retry: RetryPolicy,
    default_order: Vec<String>,
    limits: EnrichLimits,
}

impl Enricher {
    pub fn new(
        providers: Vec<Arc<dyn TextProvider>>,
        evidence: Arc<dyn EvidenceSource>,
        retry: RetryPolicy,
        default_order: Vec<String>,
        limits: EnrichLimits,
    ) -> Self {
        Self {
            providers,
            evidence,
            retry,
            default_order,
            limits,
        }
    }

    /// Enricher wired to the real providers and the web aggregator
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            build_text_providers(&config.text, &config.endpoints),
            Arc::new(WebSearchAggregator::new(&config.endpoints, config.evidence.clone())),
            config.text_retry.clone(),
            config.text_order.clone(),
            config.enrich.clone(),
        )
    }

    /// Order used when a call does not pass one
    pub fn default_order(&self) -> &[String] {
        &self.default_order
    }

    /// Names of every registered provider
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Providers for this call: the explicit order when it names any known
    /// provider, otherwise the configured order. Unknown names are skipped.
    pub fn resolve_order(&self, explicit: Option<&[String]>) -> Vec<Arc<dyn TextProvider>> {
        let lookup = |names: &[String]| select_by_name(&self.providers, names, |p| p.name());

        if let Some(order) = explicit.filter(|order| !order.is_empty()) {
            let resolved = lookup(order);
            if !resolved.is_empty() {
                return resolved;
            }
        }
        lookup(&self.default_order)
    }

    async fn gather_evidence(&self, priors: &Priors, website_content: &str) -> String {
        let web = if priors.name.is_empty() {
            String::new()
        } else {
            self.evidence
                .search_web_for_product(&priors.name, &priors.plan)
                .await
        };
        let combined = format!("{web}\n\n{website_content}");
        truncate_chars(&sanitize_text(&combined), self.limits.model_evidence_chars).to_string()
    }

    async fn run_providers(
        &self,
        providers: &[Arc<dyn TextProvider>],
        system_prompt: &str,
        user_prompt: &str,
    ) -> Option<(String, Map<String, Value>)> {
        let outcome = try_in_order(
            providers,
            &self.retry,
            |p| p.name().to_string(),
            |p| {
                let provider = Arc::clone(p);
                let system = system_prompt.to_string();
                let user = user_prompt.to_string();
                async move { provider.generate_json(&system, &user).await }
            },
        )
        .await;
        let provider = outcome.provider?;
        outcome.value.map(|value| (provider, value))
    }

    fn needs_details(&self, draft: &ProductDraft, evidence: &str) -> bool {
        let thin = draft.description.chars().count() < self.limits.detail_description_chars
            || draft.features.len() < self.limits.detail_min_features;
        thin && evidence.chars().count() > self.limits.detail_min_evidence_chars
    }

    /// Enrich free text into a complete draft. Never fails.
    pub async fn enrich_with_ai(
        &self,
        user_text: &str,
        website_content: &str,
        provider_order: Option<&[String]>,
    ) -> ProductDraft {
        let sanitized = sanitize_text(user_text);
        let priors = Priors::from_text(&sanitized);
        debug!(name = %priors.name, plan = %priors.plan, "Derived priors");

        let evidence = self.gather_evidence(&priors, website_content).await;
        let providers = self.resolve_order(provider_order);
        let user_prompt = build_user_prompt(user_text, &evidence, &priors);

        let Some((provider, answer)) = self
            .run_providers(&providers, SYSTEM_PROMPT, &user_prompt)
            .await
        else {
            warn!(name = %priors.name, "Every text provider failed, using heuristic record");
            return degraded_record(&sanitized, &priors);
        };

        let missing: Vec<&str> = DRAFT_KEYS
            .iter()
            .copied()
            .filter(|key| !answer.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            debug!(provider = %provider, ?missing, "Answer is missing keys");
        }

        let mut draft = normalize_model_output(&answer, &priors);
        info!(provider = %provider, name = %draft.name, category = %draft.category, "Draft enriched");

        if self.needs_details(&draft, &evidence) {
            let detail_prompt = build_detail_prompt(&draft, &evidence);
            match self
                .run_providers(&providers, DETAIL_SYSTEM_PROMPT, &detail_prompt)
                .await
            {
                Some((provider, details)) => {
                    debug!(provider = %provider, "Merging detail pass");
                    merge_details(&mut draft, &details);
                }
                None => warn!(name = %draft.name, "Detail pass failed, keeping first answer"),
            }
        }

        draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct StubEvidence(String);

    #[async_trait]
    impl EvidenceSource for StubEvidence {
        async fn search_web_for_product(&self, _: &str, _: &str) -> String {
            self.0.clone()
        }
    }

    /// Provider that fails or answers with fixed objects, logging each call
    struct ScriptedProvider {
        name: &'static str,
        answer: Option<Value>,
        /// Answer to the detail request; `answer` is reused when absent
        detail: Option<Value>,
        calls: Arc<Mutex<Vec<String>>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TextProvider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate_json(&self, system: &str, user: &str) -> Result<Map<String, Value>, ProviderError> {
            let is_detail = system == DETAIL_SYSTEM_PROMPT;
            let kind = if is_detail { "detail" } else { "main" };
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, kind));
            self.prompts.lock().unwrap().push(user.to_string());
            let answer = match (&self.detail, is_detail) {
                (Some(detail), true) => Some(detail),
                _ => self.answer.as_ref(),
            };
            match answer {
                Some(Value::Object(map)) => Ok(map.clone()),
                _ => Err(ProviderError::Status {
                    status: 503,
                    body: "unavailable".into(),
                }),
            }
        }
    }

    fn instant_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    fn enricher(
        providers: Vec<(&'static str, Option<Value>)>,
        evidence: &str,
        max_attempts: u32,
    ) -> (Enricher, Arc<Mutex<Vec<String>>>) {
        let (enricher, calls, _) = enricher_with_details(
            providers
                .into_iter()
                .map(|(name, answer)| (name, answer, None))
                .collect(),
            evidence,
            max_attempts,
        );
        (enricher, calls)
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn enricher_with_details(
        providers: Vec<(&'static str, Option<Value>, Option<Value>)>,
        evidence: &str,
        max_attempts: u32,
    ) -> (Enricher, Log, Log) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let order = providers.iter().map(|(n, _, _)| n.to_string()).collect();
        let providers = providers
            .into_iter()
            .map(|(name, answer, detail)| {
                Arc::new(ScriptedProvider {
                    name,
                    answer,
                    detail,
                    calls: Arc::clone(&calls),
                    prompts: Arc::clone(&prompts),
                }) as Arc<dyn TextProvider>
            })
            .collect();
        let enricher = Enricher::new(
            providers,
            Arc::new(StubEvidence(evidence.to_string())),
            instant_retry(max_attempts),
            order,
            EnrichLimits::default(),
        );
        (enricher, calls, prompts)
    }

    #[tokio::test]
    async fn test_netflix_scenario() {
        let answer = json!({
            "name": "Netflix",
            "plan": "Premium",
            "validity": "1 month",
            "price": "₹199 per month",
            "description": "Netflix Premium streams films and series in 4K HDR on four screens at the same time, with downloads on six devices.",
            "tags": ["netflix", "Netflix", "streaming", ""],
            "category": "Streaming",
            "subcategory": "Video",
            "features": ["4K", "HDR", "4 screens", "Downloads"]
        });
        let (enricher, calls) = enricher(vec![("a", Some(answer))], "", 2);
        let draft = enricher
            .enrich_with_ai("*Netflix Premium* 4K\nprice 199", "", None)
            .await;

        assert_eq!(draft.name, "Netflix");
        assert_eq!(draft.price, Some(199));
        assert_eq!(draft.category, Category::OttAccounts);
        assert_eq!(draft.tags, vec!["netflix", "streaming"]);
        assert_eq!(*calls.lock().unwrap(), vec!["a:main"]);
    }

    #[tokio::test]
    async fn test_strict_order_with_full_budgets() {
        let answer = json!({"name": "Spotify", "category": "OTT Accounts"});
        let (enricher, calls) = enricher(vec![("a", None), ("b", None), ("c", Some(answer))], "", 2);
        let draft = enricher.enrich_with_ai("Spotify Premium", "", None).await;

        assert_eq!(draft.name, "Spotify");
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["a:main", "a:main", "b:main", "b:main", "c:main"]
        );
    }

    #[tokio::test]
    async fn test_explicit_order_wins() {
        let answer = json!({"name": "Canva"});
        let (enricher, calls) = enricher(vec![("a", Some(answer.clone())), ("b", Some(answer))], "", 1);
        let order = vec!["B".to_string(), "missing".to_string()];
        enricher.enrich_with_ai("Canva Pro", "", Some(&order)).await;
        assert_eq!(*calls.lock().unwrap(), vec!["b:main"]);
    }

    #[tokio::test]
    async fn test_all_providers_fail_gives_heuristic_record() {
        let (enricher, _) = enricher(vec![("a", None), ("b", None)], "", 1);
        let draft = enricher
            .enrich_with_ai("Windows 11 Pro retail key\nonly 999 rupees", "", None)
            .await;

        assert_eq!(draft.name, "Windows 11 Pro retail key");
        assert_eq!(draft.description, draft.name);
        assert_eq!(draft.price, Some(11));
        assert_eq!(draft.category, Category::ProductKey);
        assert_eq!(draft.plan, UNKNOWN);
        assert_eq!(draft.subcategory, UNKNOWN);
        assert!(draft.tags.is_empty());
    }

    #[tokio::test]
    async fn test_empty_and_adversarial_input() {
        let (enricher, _) = enricher(vec![("a", None)], "", 1);
        for input in ["", "   \n\t", "{{{{", "```json\n```", "\u{0}\u{feff}💥"] {
            let draft = enricher.enrich_with_ai(input, "", None).await;
            assert!(Category::ALL.contains(&draft.category));
            assert!(!draft.name.is_empty());
        }
        let empty = enricher.enrich_with_ai("", "", None).await;
        assert_eq!(empty.name, UNKNOWN);
    }

    #[tokio::test]
    async fn test_no_providers_configured() {
        let (enricher, _) = enricher(vec![], "", 1);
        let draft = enricher.enrich_with_ai("Hotstar Super", "", None).await;
        assert_eq!(draft.description, "Hotstar Super");
        assert_eq!(draft.category, Category::OttAccounts);
    }

    #[tokio::test]
    async fn test_detail_pass_keeps_first_answer_when_not_longer() {
        let answer = json!({
            "name": "Grammarly",
            "description": "Writing assistant.",
            "features": ["Grammar checks"],
            "category": "Download"
        });
        let evidence = "Grammarly Premium checks grammar, tone and clarity. ".repeat(20);
        let (enricher, calls) = enricher(vec![("a", Some(answer))], &evidence, 1);
        let draft = enricher.enrich_with_ai("Grammarly Premium", "", None).await;

        // The stub answers the detail request with the same short object
        assert_eq!(draft.description, "Writing assistant.");
        assert_eq!(*calls.lock().unwrap(), vec!["a:main", "a:detail"]);
    }

    #[tokio::test]
    async fn test_detail_pass_replaces_thin_content() {
        let answer = json!({
            "name": "Grammarly",
            "description": "Writing assistant.",
            "features": ["Grammar checks"],
            "category": "Download"
        });
        let details = json!({
            "description": "Grammarly Premium checks grammar, tone and clarity as you write. It works in browsers, desktop apps and on mobile.",
            "features": ["Grammar checks", "Tone detection", "grammar checks", "Clarity rewrites", "Plagiarism checker", "Browser extension"]
        });
        let evidence = "Grammarly Premium checks grammar, tone and clarity. ".repeat(20);
        let (enricher, calls, _) =
            enricher_with_details(vec![("a", Some(answer), Some(details))], &evidence, 1);
        let draft = enricher.enrich_with_ai("Grammarly Premium", "", None).await;

        assert!(draft.description.starts_with("Grammarly Premium checks grammar"));
        assert_eq!(
            draft.features,
            vec![
                "Grammar checks",
                "Tone detection",
                "Clarity rewrites",
                "Plagiarism checker",
                "Browser extension"
            ]
        );
        assert_eq!(draft.name, "Grammarly");
        assert_eq!(*calls.lock().unwrap(), vec!["a:main", "a:detail"]);
    }

    #[tokio::test]
    async fn test_detail_pass_falls_through_to_next_provider() {
        let answer = json!({"name": "Figma", "description": "Design tool."});
        let details = json!({
            "description": "Figma is a browser-based interface design tool with real-time collaboration for teams.",
            "features": ["Prototyping", "Dev mode", "Plugins", "Comments"]
        });
        let evidence = "Figma lets teams design, prototype and hand off interfaces. ".repeat(20);
        let (enricher, calls, _) = enricher_with_details(
            vec![("a", None, None), ("b", Some(answer), Some(details))],
            &evidence,
            1,
        );
        let draft = enricher.enrich_with_ai("Figma Professional", "", None).await;

        assert!(draft.description.starts_with("Figma is a browser-based"));
        assert_eq!(draft.features.len(), 4);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["a:main", "b:main", "a:detail", "b:detail"]
        );
    }

    #[tokio::test]
    async fn test_prompt_carries_raw_operator_text() {
        let answer = json!({"name": "Netflix"});
        let (enricher, _, prompts) = enricher_with_details(vec![("a", Some(answer), None)], "", 1);
        enricher
            .enrich_with_ai("*Netflix*   Premium\n_4K_ screens", "", None)
            .await;

        let prompts = prompts.lock().unwrap();
        assert!(prompts[0].contains("*Netflix*   Premium\n_4K_ screens"));
        assert!(prompts[0].contains("Likely product name: Netflix Premium"));
    }

    #[tokio::test]
    async fn test_detail_pass_skipped_without_evidence() {
        let answer = json!({"name": "Grammarly", "description": "Short."});
        let (enricher, calls) = enricher(vec![("a", Some(answer))], "tiny", 1);
        enricher.enrich_with_ai("Grammarly", "", None).await;
        assert_eq!(*calls.lock().unwrap(), vec!["a:main"]);
    }

    #[test]
    fn test_merge_details_only_grows() {
        let mut draft = ProductDraft::new("Figma");
        draft.description = "A collaborative design tool used by product teams.".into();
        draft.features = vec!["Prototyping".into()];
        merge_details(
            &mut draft,
            json!({"description": "Design tool.", "features": "Prototyping; Dev mode; Plugins"})
                .as_object()
                .unwrap(),
        );
        assert_eq!(draft.description, "A collaborative design tool used by product teams.");
        assert_eq!(draft.features, vec!["Prototyping", "Dev mode", "Plugins"]);
    }

    #[test]
    fn test_normalization_coerces_shapes() {
        let priors = Priors {
            name: "YouTube Premium".into(),
            plan: "Family".into(),
        };
        let answer = json!({
            "name": "unknown",
            "plan": "",
            "price": 129.6,
            "tags": "video, music;video",
            "features": ["a", "b", "c", "d", "e", "f", "g", "unknown"],
            "category": ["not", "a", "string"],
        });
        let draft = normalize_model_output(answer.as_object().unwrap(), &priors);
        assert_eq!(draft.name, "YouTube Premium");
        assert_eq!(draft.plan, "Family");
        assert_eq!(draft.price, Some(130));
        assert_eq!(draft.tags, vec!["video", "music"]);
        assert_eq!(draft.features.len(), MAX_FEATURES);
        assert_eq!(draft.category, Category::OttAccounts);
        assert_eq!(draft.validity, UNKNOWN);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let answer = json!({
            "name": "Microsoft Office 2021",
            "plan": "Professional Plus",
            "price": "₹1,299.50",
            "description": "Lifetime licence for one PC.",
            "tags": ["office", "Office ", "licence"],
            "category": "key",
            "features": "Word, Excel, PowerPoint",
        });
        let priors = Priors::default();
        let once = normalize_model_output(answer.as_object().unwrap(), &priors);
        let round = serde_json::to_value(&once).unwrap();
        let twice = normalize_model_output(round.as_object().unwrap(), &priors);
        assert_eq!(once, twice);
        assert_eq!(once.category, Category::ProductKey);
        assert_eq!(once.price, Some(1300));
    }

    #[test]
    fn test_user_prompt_embeds_everything() {
        let priors = Priors {
            name: "Netflix".into(),
            plan: "Premium".into(),
        };
        let prompt = build_user_prompt("Netflix plan: Premium", "SOURCE: x\nbody", &priors);
        assert!(prompt.contains("Netflix plan: Premium"));
        assert!(prompt.contains("Likely plan: Premium"));
        assert!(prompt.contains("SOURCE: x"));
        assert!(build_user_prompt("x", "", &Priors::default()).contains("(none)"));
    }
}
