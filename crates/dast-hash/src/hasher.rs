use dast_types::Fingerprint;

/// Domain-separated BLAKE3 hasher.
///
/// Each hasher carries a domain tag (e.g., `"dast-node-v1"`) that is fed to
/// BLAKE3 before any content. A scalar, a node and a sequence with identical
/// encoded bytes therefore never share a fingerprint.
pub struct DomainHasher {
    domain: &'static str,
}

impl DomainHasher {
    /// Hasher for scalar leaves.
    pub const SCALAR: Self = Self {
        domain: "dast-scalar-v1",
    };
    /// Hasher for typed nodes.
    pub const NODE: Self = Self {
        domain: "dast-node-v1",
    };
    /// Hasher for ordered sequences.
    pub const SEQUENCE: Self = Self {
        domain: "dast-seq-v1",
    };
    /// Hasher for sequences whose element order is irrelevant.
    pub const UNORDERED: Self = Self {
        domain: "dast-unordered-v1",
    };

    /// Start an incremental, domain-separated encoding.
    pub fn start(&self) -> Encoder {
        let mut inner = blake3::Hasher::new();
        inner.update(self.domain.as_bytes());
        inner.update(b":");
        Encoder { inner }
    }
}

/// Incremental canonical encoder.
///
/// Every variable-length item is length-prefixed so that concatenations of
/// different items cannot produce the same byte stream.
pub struct Encoder {
    inner: blake3::Hasher,
}

impl Encoder {
    /// Append a one-byte tag.
    pub fn tag(&mut self, tag: u8) -> &mut Self {
        self.inner.update(&[tag]);
        self
    }

    /// Append a little-endian `u64`.
    pub fn u64(&mut self, n: u64) -> &mut Self {
        self.inner.update(&n.to_le_bytes());
        self
    }

    /// Append a length-prefixed byte string.
    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.u64(data.len() as u64);
        self.inner.update(data);
        self
    }

    /// Append a length-prefixed UTF-8 string.
    pub fn str(&mut self, s: &str) -> &mut Self {
        self.bytes(s.as_bytes())
    }

    /// Append a child fingerprint.
    pub fn fingerprint(&mut self, fp: &Fingerprint) -> &mut Self {
        self.inner.update(fp.as_bytes());
        self
    }

    /// Finalize into a fingerprint.
    pub fn finish(&self) -> Fingerprint {
        Fingerprint::from_hash(*self.inner.finalize().as_bytes())
    }
}
