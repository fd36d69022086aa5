use std::io::{self, Read, Write};

use md5::{Digest, Md5};

/// Byte length and lowercase hex MD5 of a content stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDigest {
    pub length: u64,
    pub checksum: String,
}

/// Pass-through reader that counts and hashes every byte it yields.
///
/// Wrap a content stream in a `ChecksumReader`, drain it into storage, then
/// call [`finish`](Self::finish). Only one read buffer is ever held; the
/// artifact is never materialized in memory by the reader itself.
pub struct ChecksumReader<R> {
    inner: R,
    hasher: Md5,
    length: u64,
}

impl<R: Read> ChecksumReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Md5::new(),
            length: 0,
        }
    }

    /// Bytes read so far.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Consume the reader and return the digest of everything read.
    pub fn finish(self) -> ContentDigest {
        ContentDigest {
            length: self.length,
            checksum: hex::encode(self.hasher.finalize()),
        }
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.length += n as u64;
        Ok(n)
    }
}

/// Stream `content` into `sink`, returning the digest of the copied bytes.
pub fn copy_with_digest<R: Read, W: Write + ?Sized>(
    content: R,
    sink: &mut W,
) -> io::Result<ContentDigest> {
    let mut reader = ChecksumReader::new(content);
    io::copy(&mut reader, sink)?;
    Ok(reader.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abc_digest() {
        let mut sink = Vec::new();
        let digest = copy_with_digest(&b"abc"[..], &mut sink).unwrap();
        assert_eq!(digest.length, 3);
        assert_eq!(digest.checksum, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(sink, b"abc");
    }

    #[test]
    fn empty_stream_digest() {
        let digest = copy_with_digest(io::empty(), &mut io::sink()).unwrap();
        assert_eq!(digest.length, 0);
        assert_eq!(digest.checksum, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn digest_is_independent_of_read_size() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

        let whole = copy_with_digest(data.as_slice(), &mut io::sink()).unwrap();

        let mut reader = ChecksumReader::new(data.as_slice());
        let mut buf = [0u8; 7];
        while reader.read(&mut buf).unwrap() > 0 {}
        let chunked = reader.finish();

        assert_eq!(whole, chunked);
        assert_eq!(whole.length, 100_000);
    }

    #[test]
    fn read_errors_propagate() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
        }
        let err = copy_with_digest(Failing, &mut io::sink()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
