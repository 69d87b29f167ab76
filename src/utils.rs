#[cfg(any(debug_assertions, feature = "less-optimization"))]
#[inline]
pub fn compress_stream(stream: lopdf::Stream) -> lopdf::Stream {
    stream
}

#[cfg(all(not(debug_assertions), not(feature = "less-optimization")))]
#[inline]
pub fn compress_stream(mut stream: lopdf::Stream) -> lopdf::Stream {
    let _ = stream.compress();
    stream
}
