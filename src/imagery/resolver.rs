//! Tiered image resolution: brand tiers, generative providers, then the
//! procedural card.

use std::sync::Arc;
use tracing::{info, warn};

use super::{
    BrandImageSource, CardRenderer, GradientCardRenderer, ImageSearch, ImageTier, LogoService,
    OfficialAsset,
};
use crate::config::{AppConfig, RetryPolicy};
use crate::errors::{ImagePipelineError, StorageError};
use crate::fallback::{select_by_name, try_in_order};
use crate::product::{is_known, ProductDraft, ProductTable};
use crate::providers::{build_image_providers, ImageProvider};
use crate::storage::{ImageSource, Rehoster};

/// A durable image URL and the tier it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImage {
    pub url: String,
    pub tier: ImageTier,
}

/// Prompt for the generative tier
pub fn build_image_prompt(draft: &ProductDraft) -> String {
    let mut subject = draft.name.clone();
    if draft.has_plan() {
        subject.push(' ');
        subject.push_str(&draft.plan);
    }
    let mut prompt = format!("Clean, modern promotional product artwork for {subject}");
    if is_known(&draft.description) {
        let description: String = draft.description.chars().take(300).collect();
        prompt.push_str(". ");
        prompt.push_str(&description);
    }
    prompt.push_str(". Vibrant gradient background, soft lighting, centered composition, no text, no watermark, no logos.");
    prompt
}

/// Outcome of trying to rehost one tier's image
enum Rehosted {
    Done(String),
    Skipped,
}

pub struct ImageResolver {
    brand_sources: Vec<Box<dyn BrandImageSource>>,
    providers: Vec<Arc<dyn ImageProvider>>,
    order: Vec<String>,
    retry: RetryPolicy,
    renderer: Arc<dyn CardRenderer>,
    storage: Arc<dyn Rehoster>,
}

impl ImageResolver {
    pub fn new(
        brand_sources: Vec<Box<dyn BrandImageSource>>,
        providers: Vec<Arc<dyn ImageProvider>>,
        order: Vec<String>,
        retry: RetryPolicy,
        renderer: Arc<dyn CardRenderer>,
        storage: Arc<dyn Rehoster>,
    ) -> Self {
        Self {
            brand_sources,
            providers,
            order,
            retry,
            renderer,
            storage,
        }
    }

    /// Resolver with every real tier, storing through `storage`
    pub fn from_config(config: &AppConfig, storage: Arc<dyn Rehoster>) -> Self {
        Self::new(
            vec![
                Box::new(OfficialAsset::new()),
                Box::new(LogoService::new(&config.endpoints.logo_api)),
                Box::new(ImageSearch::new(&config.endpoints.image_search)),
            ],
            build_image_providers(&config.images, &config.endpoints),
            config.image_order.clone(),
            config.image_retry.clone(),
            Arc::new(GradientCardRenderer::new()),
            storage,
        )
    }

    /// Rehost once; a bad source skips the tier, an upload failure aborts
    async fn rehost(
        &self,
        source: ImageSource,
        draft: &ProductDraft,
        table: ProductTable,
        tier: &ImageTier,
    ) -> Result<Rehosted, ImagePipelineError> {
        match self.storage.rehost(source, &draft.name, table).await {
            Ok(url) => Ok(Rehosted::Done(url)),
            Err(StorageError::Source(reason)) => {
                warn!(tier = %tier, reason = %reason, "Image source unusable, skipping tier");
                Ok(Rehosted::Skipped)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// First successful provider in `providers`, with its position
    async fn generate(
        &self,
        providers: &[Arc<dyn ImageProvider>],
        prompt: &str,
    ) -> Option<(usize, String, Vec<u8>)> {
        let outcome = try_in_order(
            providers,
            &self.retry,
            |p| p.name().to_string(),
            |p| {
                let provider = Arc::clone(p);
                let prompt = prompt.to_string();
                async move { provider.generate(&prompt).await }
            },
        )
        .await;
        let provider = outcome.provider?;
        let position = providers.iter().position(|p| p.name() == provider)?;
        outcome.value.map(|bytes| (position, provider, bytes))
    }

    /// Find or create an image for `draft` and return its durable URL.
    ///
    /// Tiers run strictly in order and each success is rehosted exactly
    /// once. Only a storage upload failure is an error; the card tier
    /// otherwise guarantees a result.
    pub async fn resolve_product_image(
        &self,
        draft: &ProductDraft,
        table: ProductTable,
    ) -> Result<ResolvedImage, ImagePipelineError> {
        for source in &self.brand_sources {
            let tier = source.tier();
            let Some(candidate) = source.find(draft).await else {
                continue;
            };
            info!(tier = %tier, url = %candidate, "Brand image candidate found");
            if let Rehosted::Done(url) = self
                .rehost(ImageSource::Url(candidate), draft, table, &tier)
                .await?
            {
                return Ok(ResolvedImage { url, tier });
            }
        }

        let prompt = build_image_prompt(draft);
        let providers = select_by_name(&self.providers, &self.order, |p| p.name());
        let mut remaining = providers.as_slice();
        while let Some((position, provider, bytes)) = self.generate(remaining, &prompt).await {
            let tier = ImageTier::Generated(provider);
            if let Rehosted::Done(url) = self
                .rehost(ImageSource::bytes(bytes), draft, table, &tier)
                .await?
            {
                return Ok(ResolvedImage { url, tier });
            }
            remaining = &remaining[position + 1..];
        }

        info!(name = %draft.name, "Rendering fallback card");
        let card = self.renderer.render(draft)?;
        let url = self
            .storage
            .rehost(
                ImageSource::Bytes {
                    data: card,
                    content_type: Some("image/png".into()),
                },
                &draft.name,
                table,
            )
            .await?;
        Ok(ResolvedImage {
            url,
            tier: ImageTier::Card,
        })
    }
}
