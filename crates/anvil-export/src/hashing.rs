//! A `Write` wrapper that feeds every byte written through SHA-256 as it
//! goes, so the final hash is available the moment the file is closed
//! without a second read pass over it.

use sha2::{Digest, Sha256};
use std::io::{self, Write};

pub struct HashingWriter<W: Write> {
 inner: W,
 hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
 pub fn new(inner: W) -> Self {
 Self {
 inner,
 hasher: Sha256::new(),
 }
 }

 pub fn finalize_hex(self) -> String {
 hex::encode(self.hasher.finalize())
 }
}

impl<W: Write> Write for HashingWriter<W> {
 fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
 let n = self.inner.write(buf)?;
 self.hasher.update(&buf[..n]);
 Ok(n)
 }

 fn flush(&mut self) -> io::Result<()> {
 self.inner.flush()
 }
}
