use std::{cell::RefCell, rc::Rc};

/// A cloneable `Write` sink which keeps everything written to it, so that a
/// script's output (or its diagnostics) can be inspected after it has run.
#[derive(Debug, Clone, Default)]
pub struct CaptureOutput {
    into: Rc<RefCell<Vec<u8>>>,
}

impl CaptureOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoded as a whole, so characters split across writes survive.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.into.borrow()).into_owned()
    }
}

impl std::io::Write for CaptureOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.into.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Display for CaptureOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.contents())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn clones_share_the_buffer() {
        let capture = CaptureOutput::new();
        let mut writer = capture.clone();
        writeln!(writer, "hello").expect("writing to memory");
        write!(writer, "world").expect("writing to memory");

        assert_eq!(capture.contents(), "hello\nworld");
    }

    #[test]
    fn multibyte_characters_split_across_writes() {
        let capture = CaptureOutput::new();
        let mut writer = capture.clone();
        let bytes = "héllo".as_bytes();

        writer.write_all(&bytes[..2]).expect("writing to memory");
        writer.write_all(&bytes[2..]).expect("writing to memory");

        assert_eq!(capture.contents(), "héllo");
        assert_eq!(capture.to_string(), "héllo");
    }
}
