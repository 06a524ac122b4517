//! Newline-delimited framing.
//!
//! Wire format: one UTF-8 request per line, one response line back. Blank
//! lines are legal and ignored by the server. Clients are humans, phones,
//! and `nc`; nothing here needs more than a line discipline.

use std::io::{self, BufRead, Write};

/// Read one line, stripped of its terminator. `Ok(None)` means a clean EOF.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// Write one response line and flush it.
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    #[test]
    fn lines_roundtrip() {
        let mut buf = Vec::new();
        write_line(&mut buf, "OK SPEED 150").unwrap();
        write_line(&mut buf, "ERR nope").unwrap();

        let mut reader = BufReader::new(Cursor::new(buf));
        assert_eq!(read_line(&mut reader).unwrap().unwrap(), "OK SPEED 150");
        assert_eq!(read_line(&mut reader).unwrap().unwrap(), "ERR nope");
        assert_eq!(read_line(&mut reader).unwrap(), None);
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let mut reader = BufReader::new(Cursor::new(b"STATUS\r\n".to_vec()));
        assert_eq!(read_line(&mut reader).unwrap().unwrap(), "STATUS");
    }
}
