//! Simulated file store
//!
//! Files live entirely in memory for the length of one run. OPENFILE
//! creates a handle over a line buffer, CLOSEFILE flushes WRITE and
//! APPEND buffers back to the run's disk, and EOF reports whether a
//! READ handle has lines left.

use std::collections::HashMap;

use crate::error::{RuntimeError, RuntimeResult};
use crate::parser::FileMode;

#[derive(Debug)]
struct FileHandle {
    lines: Vec<String>,
    cursor: usize,
    mode: FileMode,
}

/// All file state for one run
#[derive(Debug)]
pub struct FileTable {
    handles: HashMap<String, FileHandle>,
    disk: HashMap<String, Vec<String>>,
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
            disk: HashMap::new(),
        }
    }

    /// OPENFILE. A name can have at most one open handle. READ and
    /// APPEND start from the run's disk copy (empty if the name was
    /// never written); WRITE starts from an empty buffer.
    pub fn open(&mut self, filename: &str, mode: FileMode, line: usize) -> RuntimeResult<()> {
        if self.handles.contains_key(filename) {
            return Err(RuntimeError::FileAlreadyOpen {
                filename: filename.to_string(),
                line,
            });
        }
        let lines = match mode {
            FileMode::Read | FileMode::Append => {
                self.disk.get(filename).cloned().unwrap_or_default()
            }
            FileMode::Write => Vec::new(),
        };
        self.handles.insert(
            filename.to_string(),
            FileHandle {
                lines,
                cursor: 0,
                mode,
            },
        );
        Ok(())
    }

    /// READFILE: the next line of a READ handle
    pub fn read_line(&mut self, filename: &str, line: usize) -> RuntimeResult<String> {
        let handle = self.handle_mut(filename, line)?;
        if handle.mode != FileMode::Read {
            return Err(RuntimeError::FileModeViolation {
                filename: filename.to_string(),
                mode: handle.mode.to_string(),
                operation: "READFILE".to_string(),
                line,
            });
        }
        if handle.cursor >= handle.lines.len() {
            return Err(RuntimeError::ReadPastEof {
                filename: filename.to_string(),
                line,
            });
        }
        let text = handle.lines[handle.cursor].clone();
        handle.cursor += 1;
        Ok(text)
    }

    /// WRITEFILE: appends a line to a WRITE or APPEND handle
    pub fn write_line(&mut self, filename: &str, text: String, line: usize) -> RuntimeResult<()> {
        let handle = self.handle_mut(filename, line)?;
        if handle.mode == FileMode::Read {
            return Err(RuntimeError::FileModeViolation {
                filename: filename.to_string(),
                mode: handle.mode.to_string(),
                operation: "WRITEFILE".to_string(),
                line,
            });
        }
        handle.lines.push(text);
        Ok(())
    }

    /// CLOSEFILE. WRITE and APPEND buffers replace the disk copy.
    pub fn close(&mut self, filename: &str, line: usize) -> RuntimeResult<()> {
        match self.handles.remove(filename) {
            Some(handle) => {
                if handle.mode != FileMode::Read {
                    self.disk.insert(filename.to_string(), handle.lines);
                }
                Ok(())
            }
            None => Err(RuntimeError::FileNotOpen {
                filename: filename.to_string(),
                line,
            }),
        }
    }

    /// EOF(name): TRUE when a READ handle has no lines left
    pub fn eof(&self, filename: &str, line: usize) -> RuntimeResult<bool> {
        match self.handles.get(filename) {
            Some(handle) if handle.mode == FileMode::Read => {
                Ok(handle.cursor >= handle.lines.len())
            }
            Some(handle) => Err(RuntimeError::FileModeViolation {
                filename: filename.to_string(),
                mode: handle.mode.to_string(),
                operation: "EOF".to_string(),
                line,
            }),
            None => Err(RuntimeError::FileNotOpen {
                filename: filename.to_string(),
                line,
            }),
        }
    }

    fn handle_mut(&mut self, filename: &str, line: usize) -> RuntimeResult<&mut FileHandle> {
        self.handles
            .get_mut(filename)
            .ok_or_else(|| RuntimeError::FileNotOpen {
                filename: filename.to_string(),
                line,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_then_read_back() {
        let mut files = FileTable::new();
        files.open("notes.txt", FileMode::Write, 1).unwrap();
        files.write_line("notes.txt", "first".into(), 2).unwrap();
        files.write_line("notes.txt", "second".into(), 3).unwrap();
        files.close("notes.txt", 4).unwrap();

        files.open("notes.txt", FileMode::Read, 5).unwrap();
        assert_eq!(files.eof("notes.txt", 6), Ok(false));
        assert_eq!(files.read_line("notes.txt", 7), Ok("first".to_string()));
        assert_eq!(files.read_line("notes.txt", 8), Ok("second".to_string()));
        assert_eq!(files.eof("notes.txt", 9), Ok(true));
    }

    #[test]
    fn test_append_extends_the_disk_copy() {
        let mut files = FileTable::new();
        files.open("log.txt", FileMode::Write, 1).unwrap();
        files.write_line("log.txt", "a".into(), 2).unwrap();
        files.close("log.txt", 3).unwrap();

        files.open("log.txt", FileMode::Append, 4).unwrap();
        files.write_line("log.txt", "b".into(), 5).unwrap();
        files.close("log.txt", 6).unwrap();

        files.open("log.txt", FileMode::Read, 7).unwrap();
        assert_eq!(files.read_line("log.txt", 8), Ok("a".to_string()));
        assert_eq!(files.read_line("log.txt", 9), Ok("b".to_string()));
        assert_eq!(files.eof("log.txt", 10), Ok(true));
    }

    #[test]
    fn test_write_truncates_the_previous_content() {
        let mut files = FileTable::new();
        files.open("f.txt", FileMode::Write, 1).unwrap();
        files.write_line("f.txt", "old".into(), 2).unwrap();
        files.close("f.txt", 3).unwrap();

        files.open("f.txt", FileMode::Write, 4).unwrap();
        files.write_line("f.txt", "new".into(), 5).unwrap();
        files.close("f.txt", 6).unwrap();

        files.open("f.txt", FileMode::Read, 7).unwrap();
        assert_eq!(files.read_line("f.txt", 8), Ok("new".to_string()));
        assert_eq!(files.eof("f.txt", 9), Ok(true));
    }

    #[test]
    fn test_reading_a_file_never_written_is_immediately_at_eof() {
        let mut files = FileTable::new();
        files.open("empty.txt", FileMode::Read, 1).unwrap();
        assert_eq!(files.eof("empty.txt", 2), Ok(true));
        assert_eq!(
            files.read_line("empty.txt", 3),
            Err(RuntimeError::ReadPastEof {
                filename: "empty.txt".into(),
                line: 3
            })
        );
    }

    #[test]
    fn test_opening_an_open_file_fails() {
        let mut files = FileTable::new();
        files.open("f.txt", FileMode::Write, 1).unwrap();
        assert_eq!(
            files.open("f.txt", FileMode::Read, 2),
            Err(RuntimeError::FileAlreadyOpen {
                filename: "f.txt".into(),
                line: 2
            })
        );
    }

    #[test]
    fn test_closing_twice_fails() {
        let mut files = FileTable::new();
        files.open("f.txt", FileMode::Write, 1).unwrap();
        files.close("f.txt", 2).unwrap();
        assert_eq!(
            files.close("f.txt", 3),
            Err(RuntimeError::FileNotOpen {
                filename: "f.txt".into(),
                line: 3
            })
        );
    }

    #[test]
    fn test_operations_check_the_open_mode() {
        let mut files = FileTable::new();
        files.open("f.txt", FileMode::Write, 1).unwrap();
        assert!(matches!(
            files.read_line("f.txt", 2),
            Err(RuntimeError::FileModeViolation { .. })
        ));
        assert!(matches!(
            files.eof("f.txt", 3),
            Err(RuntimeError::FileModeViolation { .. })
        ));
        files.close("f.txt", 4).unwrap();

        files.open("f.txt", FileMode::Read, 5).unwrap();
        assert!(matches!(
            files.write_line("f.txt", "x".into(), 6),
            Err(RuntimeError::FileModeViolation { .. })
        ));
    }

    #[test]
    fn test_operations_need_an_open_handle() {
        let mut files = FileTable::new();
        assert!(matches!(
            files.read_line("f.txt", 1),
            Err(RuntimeError::FileNotOpen { .. })
        ));
        assert!(matches!(
            files.write_line("f.txt", "x".into(), 2),
            Err(RuntimeError::FileNotOpen { .. })
        ));
        assert!(matches!(
            files.eof("f.txt", 3),
            Err(RuntimeError::FileNotOpen { .. })
        ));
    }
}
