// ABOUTME: Eligibility policy and pure content transform for changed files
// ABOUTME: Default implementation renders Markdown files to sibling HTML files

use crate::{ChangeEntry, EntryKind, Error, Result};
use pulldown_cmark::{html, Options, Parser};

#[derive(Debug)]
pub struct Output {
    pub path: String,
    pub content: Vec<u8>,
}

/// Decides which entries get converted and how.
///
/// `transform` must be deterministic and free of I/O: replaying a page after
/// a crash has to upload byte-identical output.
pub trait Transformer: Send + Sync {
    fn is_eligible(&self, entry: &ChangeEntry) -> bool;
    fn transform(&self, path: &str, content: &[u8]) -> Result<Output>;
}

const MARKDOWN_EXT: &str = ".md";

/// Renders `*.md` to a sibling `*.html`.
///
/// Content must be UTF-8. A non-UTF-8 `.md` file fails its page on every
/// pass, so the account stays behind until the file is fixed or removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownToHtml;

impl MarkdownToHtml {
    fn output_path(path: &str) -> String {
        let stem = &path[..path.len() - MARKDOWN_EXT.len()];
        format!("{}.html", stem)
    }
}

impl Transformer for MarkdownToHtml {
    fn is_eligible(&self, entry: &ChangeEntry) -> bool {
        match entry.kind {
            EntryKind::Deleted | EntryKind::Folder => false,
            EntryKind::Created | EntryKind::Modified => {
                entry.path.to_ascii_lowercase().ends_with(MARKDOWN_EXT)
            }
        }
    }

    fn transform(&self, path: &str, content: &[u8]) -> Result<Output> {
        if !path.to_ascii_lowercase().ends_with(MARKDOWN_EXT) {
            return Err(Error::Transform {
                path: path.into(),
                message: "not a markdown path".into(),
            });
        }

        let text = std::str::from_utf8(content).map_err(|e| Error::Transform {
            path: path.into(),
            message: format!("content is not UTF-8: {}", e),
        })?;

        let parser = Parser::new_ext(text, Options::ENABLE_TABLES);
        let mut rendered = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut rendered, parser);

        Ok(Output {
            path: Self::output_path(path),
            content: rendered.into_bytes(),
        })
    }
}
