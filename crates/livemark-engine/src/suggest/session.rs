use std::cell::{Ref, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use livemark_config::PreviewSettings;
use tokio_util::sync::CancellationToken;

use super::search::{SearchKind, SearchResult};
use crate::assets::AssetPipeline;
use crate::block_id::{ensure_block_id, ensure_block_id_in_file};
use crate::decorate::{BlockLabels, DecorationContext, DecorationSet, resolve};
use crate::editing::{Cmd, Document, InsertionError, Patch, Selection};
use crate::models::NoteRef;
use crate::store::{DocumentStore, StoreError};
use crate::trigger::{Trigger, TriggerDetector, TriggerSink, TriggerState};

/// Insertion that completes after an asynchronous step.
pub type DeferredCommit = Pin<Box<dyn Future<Output = Result<Patch, CommitError>>>>;

/// Outcome of committing a suggestion. The popup is closed either way.
pub enum Commit {
    /// The link is already in the document.
    Inserted(Patch),
    /// The link goes in once the returned future completes.
    Deferred(DeferredCommit),
}

impl std::fmt::Debug for Commit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Commit::Inserted(patch) => f.debug_tuple("Inserted").field(patch).finish(),
            Commit::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("No wiki-link trigger is active")]
    NoTrigger,
    #[error(transparent)]
    Stale(#[from] InsertionError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Document closed before the insertion completed")]
    Cancelled,
}

/// One open note: its document, trigger detector and lifetime token.
pub struct EditorSession {
    doc: Rc<RefCell<Document>>,
    page: String,
    settings: PreviewSettings,
    detector: TriggerDetector,
    lifetime: CancellationToken,
    store: Rc<dyn DocumentStore>,
}

impl EditorSession {
    pub fn new(
        store: Rc<dyn DocumentStore>,
        page: &str,
        text: &str,
        settings: PreviewSettings,
    ) -> Self {
        Self {
            doc: Rc::new(RefCell::new(Document::from_text(text))),
            page: NoteRef::from_page(page).page().to_string(),
            settings,
            detector: TriggerDetector::new(),
            lifetime: CancellationToken::new(),
            store,
        }
    }

    /// Load `page` from the store.
    pub async fn open(
        store: Rc<dyn DocumentStore>,
        page: &str,
        settings: PreviewSettings,
    ) -> Result<Self, StoreError> {
        let note = NoteRef::from_page(page);
        let text = store.read(note.path()).await?;
        log::debug!("opened {} ({} bytes)", note.path(), text.len());
        Ok(Self::new(store, note.page(), &text, settings))
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn settings(&self) -> &PreviewSettings {
        &self.settings
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.doc.borrow()
    }

    pub fn text(&self) -> String {
        self.doc.borrow().text()
    }

    pub fn trigger(&self) -> &TriggerState {
        self.detector.state()
    }

    /// Token cancelled when the note is closed.
    pub fn lifetime(&self) -> &CancellationToken {
        &self.lifetime
    }

    /// Edit the document and re-evaluate the trigger as a typing change.
    pub fn apply(&mut self, cmd: Cmd, sink: &mut dyn TriggerSink) -> Patch {
        let patch = self.doc.borrow_mut().apply(cmd);
        self.evaluate(true, sink);
        patch
    }

    /// Replace the primary selection with `text`.
    pub fn type_text(&mut self, text: &str, sink: &mut dyn TriggerSink) -> Patch {
        let range = self.doc.borrow().selection().primary();
        self.apply(
            Cmd::ReplaceRange {
                range: range.from()..range.to(),
                text: text.to_string(),
            },
            sink,
        )
    }

    /// Move the selection without editing; the trigger is re-evaluated as caret movement.
    pub fn set_selection(&mut self, selection: Selection, sink: &mut dyn TriggerSink) {
        self.doc.borrow_mut().set_selection(selection);
        self.evaluate(false, sink);
    }

    /// Checkbox click. The caret stays where it was.
    pub fn toggle_task(&mut self, at: usize) -> Option<Patch> {
        self.doc.borrow_mut().toggle_task(at)
    }

    pub fn decorations(&self, labels: &dyn BlockLabels) -> DecorationSet {
        let doc = self.doc.borrow();
        let text = doc.text();
        let ctx = DecorationContext::new(&text, doc.selection(), &self.settings)
            .with_labels(labels)
            .with_indent(doc.indent_style().clone())
            .with_page(&self.page);
        resolve(&ctx)
    }

    fn evaluate(&mut self, doc_changed: bool, sink: &mut dyn TriggerSink) {
        let doc = self.doc.borrow();
        self.detector
            .evaluate(&doc.text(), doc.selection(), doc_changed, sink);
    }

    /// Insert the chosen `[[` suggestion.
    ///
    /// Pages link directly. Blocks in this note get an id first; blocks in
    /// other notes and new pages need the store, so their insertion is
    /// deferred. A `]]` already following the trigger is consumed.
    pub fn commit_suggestion(
        &mut self,
        result: &SearchResult,
        alias: Option<&str>,
        sink: &mut dyn TriggerSink,
    ) -> Result<Commit, CommitError> {
        let trigger = self.detector.state();
        if !trigger.active || trigger.trigger != Some(Trigger::WikiLink) {
            return Err(CommitError::NoTrigger);
        }
        let range = self.replacement_range(trigger.range.as_range());
        self.detector.close(sink);

        match result.kind {
            SearchKind::Page => Ok(Commit::Inserted(
                self.replace(range, &wiki_link(&result.page_name, alias)),
            )),
            SearchKind::Block if NoteRef::from_page(&result.page_name).page() == self.page => {
                Ok(Commit::Inserted(self.link_local_block(result, range, alias)))
            }
            SearchKind::Block => Ok(Commit::Deferred(self.link_remote_block(result, range, alias))),
            SearchKind::CreateNew => Ok(Commit::Deferred(self.create_and_link(result, range, alias))),
        }
    }

    /// Extend the trigger range over a `]]` that directly follows it.
    fn replacement_range(&self, range: std::ops::Range<usize>) -> std::ops::Range<usize> {
        let doc = self.doc.borrow();
        if doc.slice_to_cow(range.end..range.end + 2) == "]]" {
            range.start..range.end + 2
        } else {
            range
        }
    }

    fn replace(&mut self, range: std::ops::Range<usize>, text: &str) -> Patch {
        self.doc.borrow_mut().apply(Cmd::ReplaceRange {
            range,
            text: text.to_string(),
        })
    }

    fn link_local_block(
        &mut self,
        result: &SearchResult,
        range: std::ops::Range<usize>,
        alias: Option<&str>,
    ) -> Patch {
        let ensured = ensure_block_id(
            &mut self.doc.borrow_mut(),
            result.block_text(),
            result.line,
            &self.settings,
        );
        let (target, range) = match ensured {
            Ok(ensured) => {
                // The marker may have landed before the trigger
                let range = match &ensured.patch {
                    Some(patch) => patch.map_range(range),
                    None => range,
                };
                (ensured.id.link_target(&self.page), range)
            }
            Err(e) => {
                log::warn!("could not assign block id in {}: {e}; linking the page", self.page);
                (self.page.clone(), range)
            }
        };
        self.replace(range, &wiki_link(&target, alias))
    }

    fn link_remote_block(
        &self,
        result: &SearchResult,
        range: std::ops::Range<usize>,
        alias: Option<&str>,
    ) -> DeferredCommit {
        let pending = self.doc.borrow().capture_insertion(range);
        let doc = Rc::clone(&self.doc);
        let store = Rc::clone(&self.store);
        let token = self.lifetime.clone();
        let settings = self.settings.clone();
        let note = NoteRef::from_page(&result.page_name);
        let block_text = result.block_text().to_string();
        let line = result.line;
        let alias = alias.map(str::to_string);

        Box::pin(async move {
            let ensured = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(CommitError::Cancelled),
                ensured = ensure_block_id_in_file(store.as_ref(), note.path(), &block_text, line, &settings) => ensured,
            };
            let target = match ensured {
                Ok(id) => id.link_target(note.page()),
                Err(e) => {
                    log::warn!("could not assign block id in {}: {e}; linking the page", note.page());
                    note.page().to_string()
                }
            };
            if token.is_cancelled() {
                return Err(CommitError::Cancelled);
            }
            let patch = doc
                .borrow_mut()
                .apply_pending(&pending, &wiki_link(&target, alias.as_deref()))?;
            Ok(patch)
        })
    }

    fn create_and_link(
        &self,
        result: &SearchResult,
        range: std::ops::Range<usize>,
        alias: Option<&str>,
    ) -> DeferredCommit {
        let pending = self.doc.borrow().capture_insertion(range);
        let doc = Rc::clone(&self.doc);
        let store = Rc::clone(&self.store);
        let token = self.lifetime.clone();
        let note = NoteRef::from_page(&result.page_name);
        let alias = alias.map(str::to_string);

        Box::pin(async move {
            let created = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(CommitError::Cancelled),
                created = create_note(store.as_ref(), &note) => created,
            };
            created?;
            let patch = doc
                .borrow_mut()
                .apply_pending(&pending, &wiki_link(note.page(), alias.as_deref()))?;
            Ok(patch)
        })
    }

    /// Insert an upload placeholder image at the caret now, and swap in the
    /// saved reference once the asset store has the blob.
    pub fn start_upload(
        &mut self,
        pipeline: Rc<AssetPipeline>,
        bytes: Vec<u8>,
        suggested_name: &str,
    ) -> DeferredCommit {
        let alt: String = suggested_name
            .rsplit_once('.')
            .map_or(suggested_name, |(stem, _)| stem)
            .chars()
            .filter(|c| !matches!(c, '[' | ']'))
            .collect();
        let placeholder = pipeline.placeholder().to_string();
        let at = self.doc.borrow().selection().primary().to();

        self.doc.borrow_mut().apply(Cmd::InsertText {
            at,
            text: format!("![{alt}]({placeholder})"),
        });
        let start = at + "![".len() + alt.len() + "](".len();
        let pending = self
            .doc
            .borrow()
            .capture_insertion(start..start + placeholder.len());
        let doc = Rc::clone(&self.doc);
        let name = suggested_name.to_string();

        Box::pin(async move {
            let reference = match pipeline.save_upload(&bytes, &name).await {
                Ok(reference) => reference,
                Err(StoreError::Cancelled) => return Err(CommitError::Cancelled),
                Err(e) => return Err(CommitError::Store(e)),
            };
            let patch = doc.borrow_mut().apply_pending(&pending, &reference)?;
            Ok(patch)
        })
    }

    /// Write the document back to its note.
    pub async fn save(&self) -> Result<(), StoreError> {
        let note = NoteRef::from_page(&self.page);
        let text = self.text();
        self.store.write(note.path(), &text).await
    }

    /// Close the note. Deferred insertions still in flight become no-ops.
    pub fn close(&self) {
        self.lifetime.cancel();
    }
}

/// `[[target]]` or `[[target|alias]]`.
pub fn wiki_link(target: &str, alias: Option<&str>) -> String {
    match alias.map(str::trim) {
        Some(alias) if !alias.is_empty() => format!("[[{target}|{alias}]]"),
        _ => format!("[[{target}]]"),
    }
}

async fn create_note(store: &dyn DocumentStore, note: &NoteRef) -> Result<(), StoreError> {
    if store.exists(note.path()).await? {
        return Ok(());
    }
    log::debug!("creating {}", note.path());
    store.write(note.path(), "").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_id::existing_block_id;
    use crate::decorate::{NoLabels, Widget};
    use crate::store::{MemoryAssetStore, MemoryDocumentStore};
    use pretty_assertions::assert_eq;

    fn session(store: Rc<MemoryDocumentStore>, text: &str) -> EditorSession {
        EditorSession::new(store, "Inbox", text, PreviewSettings::default())
    }

    /// Type `query` at the end of the document so the `[[` trigger opens.
    fn open_trigger(session: &mut EditorSession, typed: &str) {
        let mut sink: Vec<TriggerState> = Vec::new();
        session.type_text(typed, &mut sink);
        assert_eq!(session.trigger().trigger, Some(Trigger::WikiLink));
    }

    #[test]
    fn page_suggestion_inserts_link() {
        let mut session = session(Rc::default(), "see ");
        let mut sink: Vec<TriggerState> = Vec::new();
        open_trigger(&mut session, "[[Pro");

        let commit = session
            .commit_suggestion(&SearchResult::page("Projects"), None, &mut sink)
            .unwrap();

        assert!(matches!(commit, Commit::Inserted(_)));
        assert_eq!(session.text(), "see [[Projects]]");
        assert!(!session.trigger().active);
        assert_eq!(sink.last().map(|s| s.active), Some(false));
    }

    #[test]
    fn closing_brackets_are_consumed_and_alias_kept() {
        let mut session = session(Rc::default(), "see [[Pr]] later");
        let mut sink: Vec<TriggerState> = Vec::new();
        session.set_selection(Selection::caret(8), &mut sink);
        // Caret movement alone before `]]` does not trigger
        assert!(!session.trigger().active);

        open_trigger(&mut session, "o");
        session
            .commit_suggestion(&SearchResult::page("Projects"), Some("the project"), &mut sink)
            .unwrap();

        assert_eq!(session.text(), "see [[Projects|the project]] later");
    }

    #[test]
    fn commit_without_trigger_is_rejected() {
        let mut session = session(Rc::default(), "plain");
        let mut sink: Vec<TriggerState> = Vec::new();

        let result = session.commit_suggestion(&SearchResult::page("X"), None, &mut sink);

        assert!(matches!(result, Err(CommitError::NoTrigger)));
        assert_eq!(session.text(), "plain");
    }

    #[test]
    fn local_block_gets_id_before_link() {
        let mut session = session(Rc::default(), "- buy milk\n");
        let mut sink: Vec<TriggerState> = Vec::new();
        open_trigger(&mut session, "[[mil");

        session
            .commit_suggestion(&SearchResult::block("Inbox", 0, "buy milk"), None, &mut sink)
            .unwrap();

        let text = session.text();
        let first_line = text.lines().next().unwrap();
        let id = existing_block_id(first_line).unwrap();
        assert_eq!(text, format!("- buy milk ^{id}\n[[Inbox#^{id}]]"));
    }

    #[test]
    fn missing_local_block_falls_back_to_page_link() {
        let mut session = session(Rc::default(), "- buy milk\n");
        let mut sink: Vec<TriggerState> = Vec::new();
        open_trigger(&mut session, "[[x");

        session
            .commit_suggestion(&SearchResult::block("Inbox", 5, "vanished"), None, &mut sink)
            .unwrap();

        assert_eq!(session.text(), "- buy milk\n[[Inbox]]");
    }

    #[tokio::test]
    async fn remote_block_link_is_deferred() {
        let store = Rc::new(MemoryDocumentStore::with_files([("Daily.md", "- call mum\n")]));
        let mut session = session(Rc::clone(&store), "");
        let mut sink: Vec<TriggerState> = Vec::new();
        open_trigger(&mut session, "[[call");

        let commit = session
            .commit_suggestion(&SearchResult::block("Daily", 0, "call mum"), None, &mut sink)
            .unwrap();
        let Commit::Deferred(task) = commit else {
            panic!("expected deferred commit");
        };
        // Popup closed before the insertion happens
        assert!(!session.trigger().active);
        assert_eq!(session.text(), "[[call");

        task.await.unwrap();

        let daily = store.get("Daily.md").unwrap();
        let id = existing_block_id(daily.lines().next().unwrap()).unwrap().to_string();
        assert_eq!(session.text(), format!("[[Daily#^{id}]]"));
    }

    #[tokio::test]
    async fn remote_block_in_missing_page_links_the_page() {
        let mut session = session(Rc::default(), "");
        let mut sink: Vec<TriggerState> = Vec::new();
        open_trigger(&mut session, "[[gone");

        let Ok(Commit::Deferred(task)) =
            session.commit_suggestion(&SearchResult::block("Gone", 0, "x"), None, &mut sink)
        else {
            panic!("expected deferred commit");
        };
        task.await.unwrap();

        assert_eq!(session.text(), "[[Gone]]");
    }

    #[tokio::test]
    async fn deferred_insertion_rejects_edited_range() {
        let store = Rc::new(MemoryDocumentStore::with_files([("Daily.md", "- call mum\n")]));
        let mut session = session(store, "x ");
        let mut sink: Vec<TriggerState> = Vec::new();
        open_trigger(&mut session, "[[call");

        let Ok(Commit::Deferred(task)) =
            session.commit_suggestion(&SearchResult::block("Daily", 0, "call mum"), None, &mut sink)
        else {
            panic!("expected deferred commit");
        };
        // The user rewrites the trigger text while the id is being assigned
        session.apply(
            Cmd::ReplaceRange {
                range: 2..8,
                text: "typed over".to_string(),
            },
            &mut sink,
        );

        let result = task.await;

        assert!(matches!(result, Err(CommitError::Stale(_))));
        assert_eq!(session.text(), "x typed over");
    }

    #[tokio::test]
    async fn deferred_insertion_survives_edits_after_range() {
        let store = Rc::new(MemoryDocumentStore::with_files([("Daily.md", "- call mum")]));
        let mut session = session(store, "");
        let mut sink: Vec<TriggerState> = Vec::new();
        open_trigger(&mut session, "[[call");

        let Ok(Commit::Deferred(task)) =
            session.commit_suggestion(&SearchResult::block("Daily", 0, "call mum"), None, &mut sink)
        else {
            panic!("expected deferred commit");
        };
        session.type_text(" more", &mut sink);

        task.await.unwrap();

        assert!(session.text().starts_with("[[Daily#^"));
        assert!(session.text().ends_with("]] more"));
    }

    #[tokio::test]
    async fn create_new_writes_note_first() {
        let store = Rc::new(MemoryDocumentStore::new());
        let mut session = session(Rc::clone(&store), "");
        let mut sink: Vec<TriggerState> = Vec::new();
        open_trigger(&mut session, "[[New Page");

        let Ok(Commit::Deferred(task)) =
            session.commit_suggestion(&SearchResult::create_new("New Page"), None, &mut sink)
        else {
            panic!("expected deferred commit");
        };
        task.await.unwrap();

        assert_eq!(store.get("New Page.md").as_deref(), Some(""));
        assert_eq!(session.text(), "[[New Page]]");
    }

    #[tokio::test]
    async fn closing_the_session_cancels_deferred_insertions() {
        let store = Rc::new(MemoryDocumentStore::new());
        let mut session = session(store, "");
        let mut sink: Vec<TriggerState> = Vec::new();
        open_trigger(&mut session, "[[Later");

        let Ok(Commit::Deferred(task)) =
            session.commit_suggestion(&SearchResult::create_new("Later"), None, &mut sink)
        else {
            panic!("expected deferred commit");
        };
        session.close();

        assert!(matches!(task.await, Err(CommitError::Cancelled)));
        assert_eq!(session.text(), "[[Later");
    }

    #[tokio::test]
    async fn upload_shows_spinner_until_saved() {
        let mut session = session(Rc::default(), "intro\n\n");
        let mut sink: Vec<TriggerState> = Vec::new();
        let (pipeline, _rx) = AssetPipeline::new(
            Rc::new(MemoryAssetStore::new("assets")),
            session.lifetime(),
            "uploading...",
        );

        let task = session.start_upload(Rc::new(pipeline), b"png".to_vec(), "cat.png");
        assert_eq!(session.text(), "intro\n\n![cat](uploading...)");
        // Move the caret off the image line so the widget is shown
        session.set_selection(Selection::caret(0), &mut sink);
        let decorations = session.decorations(&NoLabels);
        assert!(decorations.widgets().any(|(_, w)| *w == Widget::UploadSpinner));

        task.await.unwrap();

        assert_eq!(session.text(), "intro\n\n![cat](assets/cat.png)");
    }

    #[tokio::test]
    async fn open_and_save_round_trip() {
        let store = Rc::new(MemoryDocumentStore::with_files([("Inbox.md", "- [ ] buy milk")]));
        let mut session = EditorSession::open(store.clone(), "Inbox", PreviewSettings::default())
            .await
            .unwrap();

        session.toggle_task(2).unwrap();
        session.save().await.unwrap();

        assert_eq!(store.get("Inbox.md").as_deref(), Some("- [x] buy milk"));
    }
}
