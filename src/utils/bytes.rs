use crate::tensor::Element;

/// Pack typed elements into a freshly allocated native byte buffer.
pub fn elements_to_bytes<T: Element>(elements: &[T]) -> Box<[u8]> {
    let mut bytes = vec![0u8; elements.len() * T::DTYPE.size_in_bytes()];
    for (value, chunk) in elements
        .iter()
        .zip(bytes.chunks_exact_mut(T::DTYPE.size_in_bytes()))
    {
        value.write_ne(chunk);
    }
    bytes.into_boxed_slice()
}

/// Read typed elements back out of a native byte buffer. Trailing bytes that
/// do not form a whole element are ignored.
pub fn bytes_to_elements<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(T::DTYPE.size_in_bytes())
        .map(T::read_ne)
        .collect()
}
