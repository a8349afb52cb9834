use crate::error::DecodingError;

use alloy_primitives::{bytes::Buf, Bytes, B256};
use alloy_rlp::Header;

/// The length of the signature appended to each transaction.
const SIGNATURE_LENGTH: usize = 65;

/// A transaction as it appears in a batch: the unsigned RLP list followed by the `r`, `s` and `v`
/// signature values and, depending on the fork, the effective gas price percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    /// The RLP encoded unsigned transaction, header included.
    pub rlp: Bytes,
    /// The `r` value of the signature.
    pub r: B256,
    /// The `s` value of the signature.
    pub s: B256,
    /// The `v` value of the signature.
    pub v: u8,
    /// The effective gas price percentage.
    pub effective_percentage: Option<u8>,
}

impl RawTransaction {
    /// Tries to read a [`RawTransaction`] from the input buffer and advances it. `offset` is the
    /// position of the buffer in the complete stream, used for error reporting.
    pub(crate) fn try_from_buf(
        buf: &mut &[u8],
        offset: usize,
        with_percentage: bool,
    ) -> Result<Self, DecodingError> {
        // clone the buffer in order to avoid advancing it.
        #[allow(suspicious_double_ref_op)]
        let header = Header::decode(&mut buf.clone())
            .map_err(|source| DecodingError::InvalidRlp { offset, source })?;
        if !header.list {
            return Err(DecodingError::ExpectedRlpList(offset))
        }

        let rlp_len = header.length_with_payload();
        let total = rlp_len + SIGNATURE_LENGTH + usize::from(with_percentage);
        if buf.remaining() < total {
            return Err(DecodingError::Eof(offset + buf.remaining()))
        }

        let rlp = Bytes::copy_from_slice(&buf[..rlp_len]);
        buf.advance(rlp_len);
        let r = B256::from_slice(&buf[..32]);
        let s = B256::from_slice(&buf[32..64]);
        let v = buf[64];
        buf.advance(SIGNATURE_LENGTH);
        let effective_percentage = with_percentage.then(|| buf.get_u8());

        Ok(Self { rlp, r, s, v, effective_percentage })
    }

    /// Returns the encoded length of the transaction.
    pub fn encoded_len(&self) -> usize {
        self.rlp.len() + SIGNATURE_LENGTH + usize::from(self.effective_percentage.is_some())
    }

    /// Appends the encoded transaction to the output.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.rlp);
        out.extend_from_slice(self.r.as_slice());
        out.extend_from_slice(self.s.as_slice());
        out.push(self.v);
        if let Some(percentage) = self.effective_percentage {
            out.push(percentage);
        }
    }
}
