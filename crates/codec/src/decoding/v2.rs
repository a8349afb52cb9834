use crate::{
    decoding::transaction::RawTransaction,
    error::{DecodingError, EncodingError},
    try_read_be_and_advance_buf,
};

use alloy_primitives::{bytes::Buf, Bytes};

/// The marker introducing a new L2 block in a V2 stream. By RLP definition a transaction never
/// starts with this byte.
pub const CHANGE_L2_BLOCK: u8 = 0x0b;

/// The length of an encoded change L2 block header, marker included.
const CHANGE_L2_BLOCK_LENGTH: usize = 9;

/// The first byte of an RLP list header, every transaction starts at or above it.
const RLP_LIST_OFFSET: u8 = 0xc0;

/// An L2 block of a V2 batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct L2BlockRaw {
    /// The timestamp delta with the previous L2 block.
    pub delta_timestamp: u32,
    /// The index of the L1 info tree leaf used by the block.
    pub index_l1_info_tree: u32,
    /// The transactions of the block.
    pub transactions: Vec<RawTransaction>,
}

/// A V2 batch: a list of L2 blocks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchRawV2 {
    /// The L2 blocks of the batch.
    pub blocks: Vec<L2BlockRaw>,
}

impl BatchRawV2 {
    /// Returns the total number of transactions across all blocks.
    pub fn transactions_count(&self) -> usize {
        self.blocks.iter().map(|b| b.transactions.len()).sum()
    }

    /// Encodes the batch. A batch needs at least one block.
    pub fn encode(&self) -> Result<Bytes, EncodingError> {
        if self.blocks.is_empty() {
            return Err(EncodingError::EmptyBatchV2)
        }

        let mut out = Vec::new();
        for block in &self.blocks {
            out.reserve(
                CHANGE_L2_BLOCK_LENGTH +
                    block.transactions.iter().map(RawTransaction::encoded_len).sum::<usize>(),
            );
            out.push(CHANGE_L2_BLOCK);
            out.extend_from_slice(&block.delta_timestamp.to_be_bytes());
            out.extend_from_slice(&block.index_l1_info_tree.to_be_bytes());
            for tx in &block.transactions {
                tx.encode(&mut out);
            }
        }
        Ok(out.into())
    }
}

/// Decodes a V2 stream into its L2 blocks. The stream must start with a change L2 block marker.
pub fn decode_v2(data: &[u8]) -> Result<BatchRawV2, DecodingError> {
    let buf = &mut &data[..];
    let mut blocks: Vec<L2BlockRaw> = Vec::new();

    while let Some(&first) = buf.first() {
        let offset = data.len() - buf.len();
        if first == CHANGE_L2_BLOCK {
            buf.advance(1);
            let delta_timestamp =
                try_read_be_and_advance_buf!(u32, buf).ok_or(DecodingError::Eof(offset))?;
            let index_l1_info_tree =
                try_read_be_and_advance_buf!(u32, buf).ok_or(DecodingError::Eof(offset))?;
            blocks.push(L2BlockRaw { delta_timestamp, index_l1_info_tree, transactions: vec![] });
        } else if first < RLP_LIST_OFFSET {
            return Err(DecodingError::UnknownEntryType { offset, entry_type: first })
        } else {
            let block = blocks.last_mut().ok_or(DecodingError::MissingChangeL2Block)?;
            block.transactions.push(RawTransaction::try_from_buf(buf, offset, true)?);
        }
    }

    Ok(BatchRawV2 { blocks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::transaction::tests::encoded_tx;

    fn change_l2_block(delta: u32, index: u32) -> Vec<u8> {
        let mut out = vec![CHANGE_L2_BLOCK];
        out.extend_from_slice(&delta.to_be_bytes());
        out.extend_from_slice(&index.to_be_bytes());
        out
    }

    #[test]
    fn test_should_decode_v2() -> eyre::Result<()> {
        let mut data = change_l2_block(3, 0);
        data.extend(encoded_tx(1, Some(255)));
        data.extend(encoded_tx(2, Some(255)));
        data.extend(change_l2_block(2, 7));
        data.extend(change_l2_block(1, 7));
        data.extend(encoded_tx(3, Some(200)));

        let batch = decode_v2(&data)?;
        assert_eq!(batch.blocks.len(), 3);
        assert_eq!(batch.blocks[0].transactions.len(), 2);
        assert!(batch.blocks[1].transactions.is_empty());
        assert_eq!(batch.blocks[1].index_l1_info_tree, 7);
        assert_eq!(batch.blocks[2].delta_timestamp, 1);
        assert_eq!(batch.transactions_count(), 3);
        assert_eq!(batch.encode()?, Bytes::from(data));

        Ok(())
    }

    #[test]
    fn test_should_fail_without_change_l2_block() {
        let data = encoded_tx(1, Some(255));
        assert!(matches!(decode_v2(&data), Err(DecodingError::MissingChangeL2Block)));
    }

    #[test]
    fn test_should_fail_on_unknown_entry_type() {
        let data = [0x01u8, 0x02, 0x03];
        assert!(matches!(
            decode_v2(&data),
            Err(DecodingError::UnknownEntryType { offset: 0, entry_type: 0x01 })
        ));

        let mut data = change_l2_block(1, 1);
        data.extend(encoded_tx(1, Some(255)));
        data.push(0x0c);
        let offset = data.len() - 1;
        assert!(matches!(
            decode_v2(&data),
            Err(DecodingError::UnknownEntryType { offset: o, entry_type: 0x0c }) if o == offset
        ));
    }

    #[test]
    fn test_should_fail_on_truncated_header() {
        let data = change_l2_block(1, 1);
        assert!(matches!(decode_v2(&data[..6]), Err(DecodingError::Eof(0))));
    }

    #[test]
    fn test_empty_batch_cannot_be_encoded() {
        assert!(matches!(BatchRawV2::default().encode(), Err(EncodingError::EmptyBatchV2)));
        assert!(decode_v2(&[]).unwrap().blocks.is_empty());
    }
}
