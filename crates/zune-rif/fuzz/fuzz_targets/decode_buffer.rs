#![no_main]

use libfuzzer_sys::fuzz_target;
use zune_rif::zune_core::options::DecoderOptions;
use zune_rif::{ArenaPool, CRifDecoder, RifDecoder, RifReader, RifSource};

fn drain_compressed<S: RifSource>(mut decoder: CRifDecoder<S>, chunk: usize) {
    while let Ok(status) = decoder.read_chunk(chunk) {
        if status.is_closed() {
            break;
        }
    }
    if let Ok(image) = decoder.into_image().decompress(None) {
        let _ = image.get_pixel(0, 0);
    }
}

fuzz_target!(|data: &[u8]| {
    let options = DecoderOptions::default()
        .set_max_width(1024)
        .set_max_height(1024);
    let pool = ArenaPool::new(1 << 16);
    let chunk = data.first().map_or(0, |&b| usize::from(b));

    if let Ok(mut decoder) =
        RifDecoder::new_with_options(RifReader::from_bytes(data), Some(&pool), options)
    {
        while let Ok(status) = decoder.read_chunk(chunk) {
            if status.is_closed() {
                break;
            }
        }
        let _ = decoder.get_pixel(0, 0);
    }

    pool.clear();

    if let Ok(decoder) =
        CRifDecoder::new_with_options(RifReader::from_bytes(data), Some(&pool), options)
    {
        drain_compressed(decoder, chunk);
    }

    // unpooled tables are sized from the header alone
    if let Ok(decoder) = CRifDecoder::new_with_options(RifReader::from_bytes(data), None, options)
    {
        drain_compressed(decoder, chunk);
    }
});
