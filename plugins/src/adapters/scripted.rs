//! Headless editors driven by scripted input instead of a rendered widget.

use dytomate_core::api::{
    AdapterFactory, AdapterInput, AdapterKind, Commit, Document, EditAdapter, ElementId,
    FileUpload, Regions, SaveValue,
};

pub const TOOLBAR_ID: &str = "dytomate-editor-toolbar";
pub const TEXTAREA_ID: &str = "dytomate-editor-textarea";
const COMMAND_BUTTON_CLASS: &str = "dytomate-editor-command-button";
const COMMANDS: [&str; 3] = ["bold", "italic", "link"];

#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptedAdapters;

impl AdapterFactory for ScriptedAdapters {
    fn open(
        &mut self,
        kind: AdapterKind,
        element: ElementId,
        _doc: &dyn Document,
    ) -> Box<dyn EditAdapter> {
        match kind {
            AdapterKind::Text => Box::new(TextEditor::new(element)),
            AdapterKind::Media => Box::new(ImageChanger::new(element)),
        }
    }
}

/// Rich-text stand-in: typed input replaces the element's content.
#[derive(Debug)]
pub struct TextEditor {
    element: ElementId,
    toolbar: Option<ElementId>,
    draft: Option<String>,
}

impl TextEditor {
    pub fn new(element: ElementId) -> Self {
        Self {
            element,
            toolbar: None,
            draft: None,
        }
    }
}

fn top_of(doc: &dyn Document, mut id: ElementId) -> ElementId {
    while let Some(parent) = doc.parent(id) {
        id = parent;
    }
    id
}

impl EditAdapter for TextEditor {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Text
    }

    fn enable(&mut self, doc: &mut dyn Document) -> Regions {
        let root = top_of(doc, self.element);
        let toolbar = doc.append_child(root, "div");
        doc.set_attribute(toolbar, "id", TOOLBAR_ID);
        for command in COMMANDS {
            let button = doc.append_child(toolbar, "button");
            doc.set_attribute(button, "id", &format!("dytomate-editor-{command}"));
            doc.set_attribute(button, "class", COMMAND_BUTTON_CLASS);
            doc.set_attribute(button, "data-command", command);
        }
        let textarea = doc.append_child(toolbar, "textarea");
        doc.set_attribute(textarea, "id", TEXTAREA_ID);
        doc.set_attribute(textarea, "class", TEXTAREA_ID);

        self.toolbar = Some(toolbar);
        let mut regions = Regions::default();
        regions.toolbar.insert(toolbar);
        regions
    }

    fn input(&mut self, doc: &mut dyn Document, input: AdapterInput) {
        match input {
            AdapterInput::Text(text) => {
                doc.set_text(self.element, &text);
                self.draft = Some(text);
            }
            AdapterInput::File { name, .. } => {
                tracing::debug!(
                    target: "dytomate.adapter",
                    stage = "text.input.ignored",
                    file = %name
                );
            }
        }
    }

    fn commit(&mut self, _doc: &mut dyn Document) -> Option<Commit> {
        self.draft.take().map(Commit::text)
    }

    fn disable(&mut self, doc: &mut dyn Document) {
        if let Some(toolbar) = self.toolbar.take() {
            doc.remove(toolbar);
        }
    }
}

/// Image replacement: the chosen file becomes the element's new source.
#[derive(Debug)]
pub struct ImageChanger {
    element: ElementId,
    file: Option<FileUpload>,
}

impl ImageChanger {
    pub fn new(element: ElementId) -> Self {
        Self {
            element,
            file: None,
        }
    }
}

impl EditAdapter for ImageChanger {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Media
    }

    fn enable(&mut self, _doc: &mut dyn Document) -> Regions {
        Regions::default()
    }

    fn input(&mut self, doc: &mut dyn Document, input: AdapterInput) {
        match input {
            AdapterInput::File { name, bytes } => {
                doc.set_attribute(self.element, "src", &name);
                self.file = Some(FileUpload::from_bytes(name, &bytes));
            }
            AdapterInput::Text(_) => {
                tracing::debug!(
                    target: "dytomate.adapter",
                    stage = "media.input.ignored",
                    element = %self.element
                );
            }
        }
    }

    fn commit(&mut self, doc: &mut dyn Document) -> Option<Commit> {
        let file = self.file.take()?;
        let mut commit = Commit {
            value: SaveValue::File(file),
            attributes: Default::default(),
        };
        if let Some(alt) = doc.attribute(self.element, "alt") {
            commit = commit.with_attribute("alt", alt);
        }
        Some(commit)
    }

    fn disable(&mut self, _doc: &mut dyn Document) {}
}
