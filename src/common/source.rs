use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// `Source` represents some literal source code.
/// Whether a repl line or a file on disk,
/// it's essentially a string with a path, the path serving as the source's name.
/// Sources without a real path point to `./repl`.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub contents: String,
    pub path: PathBuf,
}

impl Source {
    /// Build a `Source` by reading a file from disk.
    pub fn path(path: &Path) -> io::Result<Rc<Source>> {
        let contents = fs::read_to_string(path)?;
        Ok(Rc::new(Source { contents, path: path.to_path_buf() }))
    }

    /// Build a `Source` from a bare string, e.g. a line typed at the repl.
    pub fn source(contents: &str) -> Rc<Source> {
        Rc::new(Source {
            contents: contents.to_string(),
            path: PathBuf::from("./repl"),
        })
    }
}
