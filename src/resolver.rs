//! Resolution of extensions missing from the mapping store.
//!
//! Before a batch moves anything, every extension the registry does not know
//! is handed to an [`ExtensionResolver`]. The interactive resolver asks the
//! user to pick a category; the non-interactive one leaves the extension
//! unknown so its files fail classification and stay where they are.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;

use crate::file_category::ExtensionRegistry;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to read answer: {0}")]
    Io(#[from] io::Error),
}

/// Decides the category of an extension the registry does not know.
pub trait ExtensionResolver {
    /// Returns the chosen category label (possibly the ignore label), or
    /// `None` to leave the extension unknown.
    ///
    /// `files` lists the paths carrying the extension; `categories` is every
    /// label the answer may name.
    fn resolve(
        &mut self,
        extension: &str,
        files: &[PathBuf],
        categories: &[String],
    ) -> Result<Option<String>, ResolveError>;
}

/// Leaves every unknown extension unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectUnknown;

impl ExtensionResolver for RejectUnknown {
    fn resolve(
        &mut self,
        extension: &str,
        files: &[PathBuf],
        _categories: &[String],
    ) -> Result<Option<String>, ResolveError> {
        tracing::debug!(extension, files = files.len(), "unknown extension rejected");
        Ok(None)
    }
}

/// Prompts on a terminal: numbered category menu, then a Y/N confirmation,
/// repeated until the user confirms. End of input leaves the extension unknown.
pub struct InteractivePrompt<R, W> {
    input: R,
    output: W,
}

impl InteractivePrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> InteractivePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Reads one trimmed line; `None` at end of input.
    fn read_answer(&mut self) -> Result<Option<String>, ResolveError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> ExtensionResolver for InteractivePrompt<R, W> {
    fn resolve(
        &mut self,
        extension: &str,
        files: &[PathBuf],
        categories: &[String],
    ) -> Result<Option<String>, ResolveError> {
        writeln!(
            self.output,
            "\nUnrecognised extension '{extension}'. Files with this extension:"
        )?;
        for file in files {
            writeln!(self.output, "  {}", file.display())?;
        }

        loop {
            writeln!(
                self.output,
                "\nChoose the category for '{extension}' by number:"
            )?;
            for (i, category) in categories.iter().enumerate() {
                writeln!(self.output, "{i}: {category}")?;
            }
            self.output.flush()?;

            let Some(answer) = self.read_answer()? else {
                return Ok(None);
            };

            let chosen = answer
                .parse::<usize>()
                .ok()
                .and_then(|index| categories.get(index));

            if let Some(category) = chosen {
                write!(
                    self.output,
                    "\nExtension '{extension}' will identify with '{category}'. Is that correct? Y/N\n"
                )?;
                self.output.flush()?;

                let Some(confirm) = self.read_answer()? else {
                    return Ok(None);
                };
                if confirm.eq_ignore_ascii_case("y") {
                    return Ok(Some(category.clone()));
                }
            }

            writeln!(self.output, "\nPlease choose again.")?;
        }
    }
}

/// Groups the files in `paths` by extensions the registry does not know.
pub fn unknown_extensions<'a, I>(paths: I, registry: &ExtensionRegistry) -> BTreeMap<String, Vec<PathBuf>>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let mut unknown: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in paths {
        if let Some(ext) = crate::file_record::extension_of(path)
            && !registry.is_known(&ext)
        {
            unknown.entry(ext).or_default().push(path.clone());
        }
    }
    unknown
}

/// Asks `resolver` about every unknown extension and records the answers.
/// Returns how many extensions were assigned.
pub fn resolve_unknown<'a, I>(
    paths: I,
    registry: &mut ExtensionRegistry,
    resolver: &mut dyn ExtensionResolver,
) -> Result<usize, ResolveError>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let unknown = unknown_extensions(paths, registry);
    let categories = registry.categories();
    let mut assigned = 0;

    for (ext, files) in unknown {
        let Some(category) = resolver.resolve(&ext, &files, &categories)? else {
            continue;
        };
        match registry.assign(&ext, &category) {
            Ok(()) => {
                tracing::info!(extension = %ext, category = %category, "extension mapped");
                assigned += 1;
            }
            Err(e) => tracing::warn!(extension = %ext, "resolver answer discarded: {}", e),
        }
    }

    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_category::{CategoryTable, Lookup};
    use std::io::Cursor;

    fn registry() -> ExtensionRegistry {
        ExtensionRegistry::new(CategoryTable::default(), "ignore")
    }

    fn scripted(answers: &str) -> InteractivePrompt<Cursor<Vec<u8>>, Vec<u8>> {
        InteractivePrompt::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new())
    }

    fn categories() -> Vec<String> {
        vec!["documents".into(), "ignore".into(), "photos".into()]
    }

    #[test]
    fn test_prompt_accepts_confirmed_choice() {
        let mut prompt = scripted("2\ny\n");
        let answer = prompt
            .resolve(".raf", &[PathBuf::from("in/a.raf")], &categories())
            .unwrap();
        assert_eq!(answer.as_deref(), Some("photos"));

        let shown = String::from_utf8(prompt.output).unwrap();
        assert!(shown.contains("in/a.raf"));
        assert!(shown.contains("2: photos"));
    }

    #[test]
    fn test_prompt_retries_on_bad_input() {
        let mut prompt = scripted("9\nabc\n0\nn\n1\nY\n");
        let answer = prompt.resolve(".bak", &[], &categories()).unwrap();
        assert_eq!(answer.as_deref(), Some("ignore"));

        let shown = String::from_utf8(prompt.output).unwrap();
        assert_eq!(shown.matches("Please choose again").count(), 3);
    }

    #[test]
    fn test_prompt_end_of_input() {
        let mut prompt = scripted("");
        assert_eq!(prompt.resolve(".bak", &[], &categories()).unwrap(), None);

        let mut prompt = scripted("0\n");
        assert_eq!(prompt.resolve(".bak", &[], &categories()).unwrap(), None);
    }

    #[test]
    fn test_unknown_extensions_grouped() {
        let registry = registry();
        let paths = vec![
            PathBuf::from("in/a.xyz"),
            PathBuf::from("in/b.XYZ"),
            PathBuf::from("in/c.jpg"),
            PathBuf::from("in/README"),
            PathBuf::from("in/d.tmp"),
        ];

        let unknown = unknown_extensions(&paths, &registry);
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[".xyz"].len(), 2);
    }

    #[test]
    fn test_resolve_unknown_assigns() {
        let mut registry = registry();
        let paths = vec![PathBuf::from("in/a.xyz"), PathBuf::from("in/b.abc")];
        let mut resolver = scripted("0\ny\n");

        // The menu lists registry categories in sorted order; 0 is "documents".
        let assigned = resolve_unknown(&paths, &mut registry, &mut resolver).unwrap();
        assert_eq!(assigned, 1);
        assert!(registry.is_dirty());
        assert_eq!(
            registry.lookup(".abc"),
            Lookup::Mapped(crate::file_category::Category::new("documents"))
        );
        assert_eq!(registry.lookup(".xyz"), Lookup::Unknown);
    }

    #[test]
    fn test_reject_unknown_leaves_registry_clean() {
        let mut registry = registry();
        let paths = vec![PathBuf::from("in/a.xyz")];
        let assigned = resolve_unknown(&paths, &mut registry, &mut RejectUnknown).unwrap();
        assert_eq!(assigned, 0);
        assert!(!registry.is_dirty());
    }
}
