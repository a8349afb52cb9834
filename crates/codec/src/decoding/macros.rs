/// Reads a big endian $ty from the front of the provided buffer and advances it. Evaluates to
/// [`None`] if the buffer is too short.
#[macro_export]
macro_rules! try_read_be_and_advance_buf {
    ($ty: ty, $buf: expr) => {{
        const SIZE: usize = ::std::mem::size_of::<$ty>();
        if $buf.len() < SIZE {
            None
        } else {
            let mut arr = [0u8; SIZE];
            arr.copy_from_slice(&$buf[..SIZE]);
            ::alloy_primitives::bytes::Buf::advance($buf, SIZE);
            Some(<$ty>::from_be_bytes(arr))
        }
    }};
}
