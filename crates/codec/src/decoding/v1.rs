use crate::{decoding::transaction::RawTransaction, error::DecodingError};

use alloy_primitives::Bytes;

/// Decodes a flat list of transactions. `with_percentage` indicates if each transaction is
/// followed by its effective gas price percentage.
pub fn decode_v1(data: &[u8], with_percentage: bool) -> Result<Vec<RawTransaction>, DecodingError> {
    let buf = &mut &data[..];
    let mut transactions = Vec::new();

    while !buf.is_empty() {
        let offset = data.len() - buf.len();
        transactions.push(RawTransaction::try_from_buf(buf, offset, with_percentage)?);
    }

    Ok(transactions)
}

/// Encodes a flat list of transactions.
pub fn encode_v1(transactions: &[RawTransaction]) -> Bytes {
    let mut out = Vec::with_capacity(transactions.iter().map(RawTransaction::encoded_len).sum());
    for tx in transactions {
        tx.encode(&mut out);
    }
    out.into()
}
