//! Image widgets and the asynchronous asset resolution pipeline.
//!
//! A decoration pass emits [`ImageWidget`]s synchronously. The
//! [`AssetPipeline`] resolves each one through the [`AssetStore`] off the
//! pass, caches the result for the life of the pipeline and asks the
//! presentation layer to re-measure once a source is ready. Every resolution
//! races the owning document's [`CancellationToken`], so nothing is written
//! back after [`AssetPipeline::teardown`].

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::rc::Rc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::decorate::DecorationSet;
use crate::store::{AssetStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImagePlacement {
    /// The image is the only thing on its line.
    Block,
    /// The image sits inside other text.
    Inline,
}

/// Image to render in place of `![alt](reference)`.
///
/// Block images compare by reference alone; inline images also compare by alt
/// text. Equal widgets share one resolution.
#[derive(Debug, Clone)]
pub struct ImageWidget {
    pub reference: String,
    pub alt: String,
    pub placement: ImagePlacement,
}

impl ImageWidget {
    pub fn new(reference: impl Into<String>, alt: impl Into<String>, placement: ImagePlacement) -> Self {
        Self {
            reference: reference.into(),
            alt: alt.into(),
            placement,
        }
    }
}

impl PartialEq for ImageWidget {
    fn eq(&self, other: &Self) -> bool {
        self.placement == other.placement
            && self.reference == other.reference
            && (self.placement == ImagePlacement::Block || self.alt == other.alt)
    }
}

impl Eq for ImageWidget {}

impl Hash for ImageWidget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.placement.hash(state);
        self.reference.hash(state);
        if self.placement == ImagePlacement::Inline {
            self.alt.hash(state);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageState {
    /// Rendered invisibly until resolution finishes.
    Pending,
    /// The reference is the upload placeholder; render a spinner.
    Uploading,
    Ready(String),
    /// Resolution failed. Stays hidden; there is no retry.
    Unavailable,
}

impl ImageState {
    pub fn is_visible(&self) -> bool {
        matches!(self, ImageState::Ready(_))
    }
}

/// Follow-up work for the presentation layer. Never a re-entrant decoration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderRequest {
    Remeasure { reference: String },
}

pub type ResolveTask = Pin<Box<dyn Future<Output = ()>>>;

pub struct AssetPipeline {
    store: Rc<dyn AssetStore>,
    cache: Rc<RefCell<HashMap<ImageWidget, ImageState>>>,
    tx: mpsc::UnboundedSender<RenderRequest>,
    token: CancellationToken,
    placeholder: String,
}

impl AssetPipeline {
    /// `lifetime` is the owning document's token; the pipeline holds a child of it.
    pub fn new(
        store: Rc<dyn AssetStore>,
        lifetime: &CancellationToken,
        placeholder: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<RenderRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = Self {
            store,
            cache: Rc::default(),
            tx,
            token: lifetime.child_token(),
            placeholder: placeholder.into(),
        };
        (pipeline, rx)
    }

    pub fn state(&self, widget: &ImageWidget) -> ImageState {
        if widget.reference == self.placeholder {
            return ImageState::Uploading;
        }
        self.cache
            .borrow()
            .get(widget)
            .cloned()
            .unwrap_or(ImageState::Pending)
    }

    /// Start resolving `widget` unless an equal widget is already known.
    ///
    /// The caller drives the returned future (typically with
    /// `tokio::task::spawn_local`).
    pub fn request(&self, widget: &ImageWidget) -> Option<ResolveTask> {
        if self.token.is_cancelled() {
            return None;
        }
        if widget.reference == self.placeholder {
            self.cache
                .borrow_mut()
                .insert(widget.clone(), ImageState::Uploading);
            return None;
        }
        {
            let mut cache = self.cache.borrow_mut();
            if cache.contains_key(widget) {
                return None;
            }
            cache.insert(widget.clone(), ImageState::Pending);
        }

        let store = Rc::clone(&self.store);
        let cache = Rc::clone(&self.cache);
        let tx = self.tx.clone();
        let token = self.token.clone();
        let widget = widget.clone();
        log::trace!("resolving asset {}", widget.reference);

        Some(Box::pin(async move {
            let resolved = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    log::trace!("resolution of {} cancelled", widget.reference);
                    return;
                }
                resolved = store.resolve(&widget.reference) => resolved,
            };

            let ready = {
                let mut cache = cache.borrow_mut();
                // Gone if the widget was dropped by a later pass or the pipeline torn down
                let Some(entry) = cache.get_mut(&widget) else {
                    return;
                };
                match resolved {
                    Some(source) => {
                        *entry = ImageState::Ready(source);
                        true
                    }
                    None => {
                        log::warn!("asset {} could not be resolved", widget.reference);
                        *entry = ImageState::Unavailable;
                        false
                    }
                }
            };

            if ready
                && tx
                    .send(RenderRequest::Remeasure {
                        reference: widget.reference.clone(),
                    })
                    .is_err()
            {
                log::trace!("render channel closed");
            }
        }))
    }

    /// Forget every cached widget not in `widgets`.
    pub fn retain<'w>(&self, widgets: impl IntoIterator<Item = &'w ImageWidget>) {
        let keep: HashSet<&ImageWidget> = widgets.into_iter().collect();
        self.cache.borrow_mut().retain(|widget, _| keep.contains(widget));
    }

    /// Align the cache with a fresh decoration pass and start any new resolutions.
    pub fn sync(&self, decorations: &DecorationSet) -> Vec<ResolveTask> {
        self.retain(decorations.images());
        decorations
            .images()
            .filter_map(|widget| self.request(widget))
            .collect()
    }

    /// Save an uploaded blob, giving up if the document goes away first.
    pub async fn save_upload(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StoreError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StoreError::Cancelled),
            saved = self.store.save(bytes, suggested_name) => saved,
        }
    }

    pub fn teardown(&self) {
        self.token.cancel();
        self.cache.borrow_mut().clear();
    }

    pub fn is_torn_down(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorate::{DecorationContext, resolve};
    use crate::editing::Selection;
    use crate::store::MemoryAssetStore;
    use async_trait::async_trait;
    use livemark_config::PreviewSettings;
    use pretty_assertions::assert_eq;

    /// Never finishes resolving.
    struct StalledStore;

    #[async_trait(?Send)]
    impl AssetStore for StalledStore {
        async fn save(&self, _bytes: &[u8], _name: &str) -> Result<String, StoreError> {
            std::future::pending().await
        }

        async fn resolve(&self, _reference: &str) -> Option<String> {
            std::future::pending().await
        }
    }

    fn memory_pipeline() -> (AssetPipeline, mpsc::UnboundedReceiver<RenderRequest>) {
        let store = MemoryAssetStore::new("assets");
        store.insert("assets/cat.png", b"png");
        AssetPipeline::new(Rc::new(store), &CancellationToken::new(), "uploading...")
    }

    fn block(reference: &str, alt: &str) -> ImageWidget {
        ImageWidget::new(reference, alt, ImagePlacement::Block)
    }

    #[test]
    fn block_widgets_ignore_alt_inline_widgets_do_not() {
        assert_eq!(block("a.png", "one"), block("a.png", "two"));
        assert_ne!(
            ImageWidget::new("a.png", "one", ImagePlacement::Inline),
            ImageWidget::new("a.png", "two", ImagePlacement::Inline)
        );
        assert_ne!(
            block("a.png", "one"),
            ImageWidget::new("a.png", "one", ImagePlacement::Inline)
        );
    }

    #[tokio::test]
    async fn resolution_makes_widget_visible_and_requests_remeasure() {
        let (pipeline, mut rx) = memory_pipeline();
        let widget = block("assets/cat.png", "cat");

        assert_eq!(pipeline.state(&widget), ImageState::Pending);
        pipeline.request(&widget).unwrap().await;

        assert_eq!(
            pipeline.state(&widget),
            ImageState::Ready("memory://assets/cat.png".to_string())
        );
        assert!(pipeline.state(&widget).is_visible());
        assert_eq!(
            rx.try_recv().unwrap(),
            RenderRequest::Remeasure {
                reference: "assets/cat.png".to_string()
            }
        );
    }

    #[tokio::test]
    async fn equal_widget_is_not_resolved_twice() {
        let (pipeline, _rx) = memory_pipeline();

        let first = pipeline.request(&block("assets/cat.png", "a"));
        let second = pipeline.request(&block("assets/cat.png", "b"));

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn failed_resolution_stays_hidden() {
        let (pipeline, mut rx) = memory_pipeline();
        let widget = block("assets/missing.png", "");

        pipeline.request(&widget).unwrap().await;

        assert_eq!(pipeline.state(&widget), ImageState::Unavailable);
        assert!(!pipeline.state(&widget).is_visible());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn teardown_mid_resolution_is_a_no_op() {
        let lifetime = CancellationToken::new();
        let (pipeline, mut rx) = AssetPipeline::new(Rc::new(StalledStore), &lifetime, "uploading...");
        let widget = block("assets/cat.png", "");
        let task = pipeline.request(&widget).unwrap();

        tokio::join!(task, async {
            tokio::task::yield_now().await;
            pipeline.teardown();
        });

        assert!(pipeline.is_torn_down());
        assert_eq!(pipeline.state(&widget), ImageState::Pending);
        assert!(rx.try_recv().is_err());
        assert!(pipeline.request(&widget).is_none());
    }

    #[tokio::test]
    async fn closing_the_document_cancels_the_pipeline() {
        let lifetime = CancellationToken::new();
        let (pipeline, _rx) = AssetPipeline::new(Rc::new(StalledStore), &lifetime, "uploading...");

        lifetime.cancel();

        assert!(pipeline.is_torn_down());
        assert!(matches!(
            pipeline.save_upload(b"png", "cat.png").await,
            Err(StoreError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn widget_dropped_by_later_pass_is_not_updated() {
        let (pipeline, mut rx) = memory_pipeline();
        let widget = block("assets/cat.png", "");
        let task = pipeline.request(&widget).unwrap();

        let next_pass: [&ImageWidget; 0] = [];
        pipeline.retain(next_pass);
        task.await;

        assert_eq!(pipeline.state(&widget), ImageState::Pending);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn placeholder_reference_is_uploading() {
        let (pipeline, _rx) = memory_pipeline();
        let widget = block("uploading...", "");

        assert!(pipeline.request(&widget).is_none());
        assert_eq!(pipeline.state(&widget), ImageState::Uploading);
    }

    #[tokio::test]
    async fn sync_follows_decoration_pass() {
        let (pipeline, _rx) = memory_pipeline();
        let settings = PreviewSettings::default();
        let text = "![cat](assets/cat.png)\n\n![dog](assets/dog.png)\n\nend";
        let selection = Selection::caret(text.len());
        let decorations = resolve(&DecorationContext::new(text, &selection, &settings));

        let tasks = pipeline.sync(&decorations);
        assert_eq!(tasks.len(), 2);
        for task in tasks {
            task.await;
        }
        assert!(pipeline.sync(&decorations).is_empty());

        let upload = pipeline.save_upload(b"new", "cat.png").await.unwrap();
        assert_eq!(upload, "assets/cat-1.png");
    }
}
