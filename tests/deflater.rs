#![cfg(any(feature = "zlib", feature = "zlib-static", feature = "zlib-ng"))]

use std::io::Read;

use deflater::{Deflater, Error, FlushMode, Lifecycle, Strategy, BEST_SPEED, BEST_COMPRESSION, DEFAULT_COMPRESSION};
use deflater::engine::{ZlibMode, ZlibOptions};
use flate2::{Decompress, FlushDecompress};

fn sample(len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(len);
    let mut idx = 0;
    while data.len() < len {
        data.extend_from_slice(format!("{idx} bottles of beer on the wall, {idx} bottles of beer.\n").as_bytes());
        idx += 1;
    }
    data.truncate(len);
    data
}

fn inflate_zlib(compressed: &[u8]) -> Vec<u8> {
    let mut output = Vec::new();
    flate2::read::ZlibDecoder::new(compressed).read_to_end(&mut output).expect("valid zlib stream");
    output
}

fn adler32(data: &[u8]) -> u32 {
    let (mut a, mut b) = (1u32, 0u32);
    for byte in data {
        a = (a + *byte as u32) % 65521;
        b = (b + a) % 65521;
    }
    (b << 16) | a
}

//Drains deflater into `output` in chunks of `chunk` bytes, until `mode` is complete.
fn drain(deflater: &Deflater, output: &mut Vec<u8>, chunk: usize, mode: FlushMode) -> usize {
    let mut total = 0;
    let mut buffer = vec![0; chunk];
    loop {
        let len = deflater.compress(&mut buffer, 0, chunk, mode).expect("compress");
        output.extend_from_slice(&buffer[..len]);
        total += len;
        match mode {
            FlushMode::NoFlush => if deflater.needs_input() && !deflater.params_pending() {
                break;
            },
            FlushMode::SyncFlush | FlushMode::FullFlush => if len < chunk && !deflater.params_pending() {
                break;
            },
        }
    }
    total
}

fn finish(deflater: &Deflater, output: &mut Vec<u8>, chunk: usize) -> usize {
    deflater.finish().expect("finish");
    let mut total = 0;
    let mut buffer = vec![0; chunk];
    while !deflater.finished() {
        let len = deflater.deflate(&mut buffer).expect("compress");
        output.extend_from_slice(&buffer[..len]);
        total += len;
    }
    total
}

#[test]
fn should_need_input_until_input_is_set() {
    let deflater = Deflater::new().expect("create deflater");
    assert!(deflater.needs_input());
    assert_eq!(deflater.lifecycle(), Lifecycle::Open);

    deflater.set_input(sample(100), 10, 50).expect("set input");
    assert!(!deflater.needs_input());

    let mut output = Vec::new();
    drain(&deflater, &mut output, 64, FlushMode::NoFlush);
    assert!(deflater.needs_input());
    assert_eq!(deflater.bytes_read().unwrap(), 50);
}

#[test]
fn should_treat_empty_input_as_needing_input() {
    let deflater = Deflater::new().expect("create deflater");
    deflater.set_input(sample(10), 10, 0).expect("set input");
    assert!(deflater.needs_input());
}

#[test]
fn should_reject_out_of_bounds_ranges() {
    let deflater = Deflater::new().expect("create deflater");

    let error = deflater.set_input(vec![0u8; 4], 5, 0).unwrap_err();
    assert!(matches!(error, Error::InvalidArgument(_)), "{error:?}");
    let error = deflater.set_input(vec![0u8; 4], 2, 3).unwrap_err();
    assert!(matches!(error, Error::InvalidArgument(_)), "{error:?}");
    let error = deflater.set_input(vec![0u8; 4], usize::MAX, 2).unwrap_err();
    assert!(matches!(error, Error::InvalidArgument(_)), "{error:?}");
    let error = deflater.set_dictionary(&[0u8; 4], 1, 4).unwrap_err();
    assert!(matches!(error, Error::InvalidArgument(_)), "{error:?}");

    let mut output = [0u8; 16];
    let error = deflater.compress(&mut output, 8, 9, FlushMode::NoFlush).unwrap_err();
    assert!(matches!(error, Error::InvalidArgument(_)), "{error:?}");
    assert_eq!(deflater.bytes_written().unwrap(), 0);

    //Full range is fine
    deflater.set_input(vec![0u8; 4], 0, 4).expect("set input");
    deflater.set_input(vec![0u8; 4], 4, 0).expect("set input");
}

#[test]
fn should_validate_parameters() {
    let deflater = Deflater::new().expect("create deflater");

    for level in [-2, 10, i32::MIN, i32::MAX] {
        let error = deflater.set_level(level).unwrap_err();
        assert!(matches!(error, Error::InvalidArgument(_)), "{error:?}");
    }
    for level in -1..=9 {
        deflater.set_level(level).expect("valid level");
    }

    assert!(matches!(Strategy::try_from(3), Err(Error::InvalidArgument(_))));
    assert!(matches!(Strategy::try_from(-1), Err(Error::InvalidArgument(_))));
    assert_eq!(Strategy::try_from(Strategy::HUFFMAN_ONLY).unwrap(), Strategy::HuffmanOnly);
    assert_eq!(Strategy::Filtered.as_raw(), Strategy::FILTERED);

    assert!(matches!(FlushMode::try_from(1), Err(Error::InvalidArgument(_))));
    assert!(matches!(FlushMode::try_from(4), Err(Error::InvalidArgument(_))));
    assert_eq!(FlushMode::try_from(FlushMode::SYNC_FLUSH).unwrap(), FlushMode::SyncFlush);
    assert_eq!(FlushMode::try_from(FlushMode::FULL_FLUSH).unwrap(), FlushMode::FullFlush);

    let error = Deflater::with_level(11, false).unwrap_err();
    assert!(matches!(error, Error::InvalidArgument(_)), "{error:?}");
    let error = Deflater::with_options(ZlibOptions::new().mem_level(0)).unwrap_err();
    assert!(matches!(error, Error::InvalidArgument(_)), "{error:?}");
}

#[test]
fn should_mark_params_pending_only_on_change() {
    let deflater = Deflater::new().expect("create deflater");
    assert_eq!(deflater.level(), DEFAULT_COMPRESSION);

    deflater.set_level(DEFAULT_COMPRESSION).expect("set level");
    deflater.set_strategy(Strategy::Default).expect("set strategy");
    assert!(!deflater.params_pending());

    deflater.set_level(BEST_SPEED).expect("set level");
    assert!(deflater.params_pending());
    assert_eq!(deflater.level(), BEST_SPEED);

    let mut output = [0u8; 64];
    deflater.deflate(&mut output).expect("compress");
    assert!(!deflater.params_pending());

    deflater.set_strategy(Strategy::HuffmanOnly).expect("set strategy");
    assert!(deflater.params_pending());
    assert_eq!(deflater.strategy(), Strategy::HuffmanOnly);
}

#[test]
fn should_account_every_byte() {
    let data = sample(50_000);
    let deflater = Deflater::with_level(BEST_COMPRESSION, false).expect("create deflater");
    let mut output = Vec::new();

    let mut produced = 0;
    for chunk in data.chunks(3_001) {
        deflater.set_input(chunk.to_vec(), 0, chunk.len()).expect("set input");
        produced += drain(&deflater, &mut output, 7, FlushMode::NoFlush);
        assert_eq!(deflater.bytes_written().unwrap(), produced as u64);
    }
    produced += finish(&deflater, &mut output, 7);

    assert_eq!(deflater.bytes_read().unwrap(), data.len() as u64);
    assert_eq!(deflater.bytes_written().unwrap(), produced as u64);
    assert_eq!(produced, output.len());
    assert!(output.len() < data.len());
    assert_eq!(inflate_zlib(&output), data);
}

#[test]
fn should_expose_adler32_of_input() {
    let data = sample(10_000);
    let deflater = Deflater::new().expect("create deflater");
    assert_eq!(deflater.checksum().unwrap(), 1);

    let mut output = Vec::new();
    deflater.set_input_all(data.clone()).expect("set input");
    drain(&deflater, &mut output, 512, FlushMode::NoFlush);
    finish(&deflater, &mut output, 512);

    let expected = adler32(&data);
    assert_eq!(deflater.checksum().unwrap(), expected);
    let trailer = &output[output.len() - 4..];
    assert_eq!(u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]), expected);
}

#[test]
fn should_prime_dictionary() {
    let dictionary = b"bottles of beer on the wall";
    let data = sample(2_000);

    let deflater = Deflater::new().expect("create deflater");
    deflater.set_dictionary(dictionary, 0, dictionary.len()).expect("set dictionary");
    assert_eq!(deflater.checksum().unwrap(), adler32(dictionary));

    let mut output = Vec::new();
    deflater.set_input_all(data.clone()).expect("set input");
    drain(&deflater, &mut output, 128, FlushMode::NoFlush);
    finish(&deflater, &mut output, 128);

    //FDICT flag followed by DICTID
    assert_eq!(output[1] & 0x20, 0x20);
    assert_eq!(u32::from_be_bytes([output[2], output[3], output[4], output[5]]), adler32(dictionary));
}

#[test]
fn should_refuse_dictionary_after_compression_started() {
    let deflater = Deflater::new().expect("create deflater");
    let mut output = Vec::new();
    deflater.set_input_all(sample(1_000)).expect("set input");
    drain(&deflater, &mut output, 128, FlushMode::NoFlush);

    let error = deflater.set_dictionary_all(b"dictionary").unwrap_err();
    assert!(matches!(error, Error::EngineFault(_)), "{error:?}");
}

#[test]
fn should_emit_all_input_on_sync_flush() {
    let data = sample(20_000);
    let deflater = Deflater::new().expect("create deflater");
    let mut decompress = Decompress::new(true);
    let mut output = Vec::new();
    let mut decompressed = Vec::with_capacity(data.len() + 1);

    let mut expected_len = 0;
    for chunk in data.chunks(4_999) {
        deflater.set_input_all(chunk.to_vec()).expect("set input");
        drain(&deflater, &mut output, 256, FlushMode::NoFlush);
        drain(&deflater, &mut output, 256, FlushMode::SyncFlush);
        expected_len += chunk.len();

        let consumed = decompress.total_in() as usize;
        decompress.decompress_vec(&output[consumed..], &mut decompressed, FlushDecompress::Sync).expect("decompress");
        assert_eq!(decompress.total_in() as usize, output.len());
        assert_eq!(decompressed, &data[..expected_len]);
    }
}

#[test]
fn should_create_resync_point_on_full_flush() {
    let first = sample(5_000);
    let second = b"second part, which must not reference first one".repeat(20);

    let deflater = Deflater::with_level(DEFAULT_COMPRESSION, true).expect("create deflater");
    let mut output = Vec::new();
    deflater.set_input_all(first.clone()).expect("set input");
    drain(&deflater, &mut output, 100, FlushMode::NoFlush);
    drain(&deflater, &mut output, 100, FlushMode::FullFlush);
    let resync = output.len();

    deflater.set_input_all(second.clone()).expect("set input");
    drain(&deflater, &mut output, 100, FlushMode::NoFlush);
    drain(&deflater, &mut output, 100, FlushMode::SyncFlush);

    let mut decompress = Decompress::new(false);
    let mut decompressed = Vec::with_capacity(second.len() + 1);
    decompress.decompress_vec(&output[resync..], &mut decompressed, FlushDecompress::Sync).expect("decompress");
    assert_eq!(decompressed, second);
}

#[test]
fn should_produce_raw_deflate() {
    let data = sample(3_000);
    let deflater = Deflater::with_options(ZlibOptions::new().mode(ZlibMode::Deflate).compression(BEST_SPEED)).expect("create deflater");
    let mut output = Vec::new();
    deflater.set_input_all(data.clone()).expect("set input");
    drain(&deflater, &mut output, 64, FlushMode::NoFlush);
    finish(&deflater, &mut output, 64);

    let mut decompressed = Vec::new();
    flate2::read::DeflateDecoder::new(&output[..]).read_to_end(&mut decompressed).expect("valid deflate stream");
    assert_eq!(decompressed, data);
}

#[test]
fn should_apply_params_change_mid_stream() {
    let data = sample(30_000);
    let deflater = Deflater::new().expect("create deflater");
    let mut output = Vec::new();

    let params = [
        (BEST_SPEED, Strategy::Default),
        (0, Strategy::Default),
        (BEST_COMPRESSION, Strategy::Filtered),
        (BEST_COMPRESSION, Strategy::HuffmanOnly),
        (DEFAULT_COMPRESSION, Strategy::Default),
    ];
    for (chunk, (level, strategy)) in data.chunks(6_000).zip(params) {
        deflater.set_level(level).expect("set level");
        deflater.set_strategy(strategy).expect("set strategy");
        deflater.set_input_all(chunk.to_vec()).expect("set input");
        drain(&deflater, &mut output, 33, FlushMode::NoFlush);
        assert!(!deflater.params_pending());
    }
    finish(&deflater, &mut output, 33);

    assert_eq!(deflater.bytes_written().unwrap(), output.len() as u64);
    assert_eq!(inflate_zlib(&output), data);
}

#[test]
fn should_go_through_lifecycle() {
    let deflater = Deflater::new().expect("create deflater");
    assert_eq!(deflater.lifecycle(), Lifecycle::Open);

    deflater.finish().expect("finish");
    deflater.finish().expect("finish again");
    assert_eq!(deflater.lifecycle(), Lifecycle::FinishRequested);
    assert!(!deflater.finished());

    let mut output = Vec::new();
    finish(&deflater, &mut output, 3);
    assert_eq!(deflater.lifecycle(), Lifecycle::Finished);
    assert!(deflater.finished());
    assert_eq!(inflate_zlib(&output), b"");

    //Engine keeps reporting end of stream
    let mut buffer = [0u8; 16];
    assert_eq!(deflater.deflate(&mut buffer).expect("compress"), 0);
    assert!(deflater.finished());

    deflater.close();
    assert_eq!(deflater.lifecycle(), Lifecycle::Closed);
    assert!(deflater.finished());
}

#[test]
fn should_fail_after_close() {
    let deflater = Deflater::new().expect("create deflater");
    deflater.set_input_all(sample(100)).expect("set input");
    deflater.close();
    deflater.close();

    let mut output = [0u8; 64];
    assert!(matches!(deflater.compress(&mut output, 0, 64, FlushMode::NoFlush), Err(Error::ClosedState)));
    assert!(matches!(deflater.checksum(), Err(Error::ClosedState)));
    assert!(matches!(deflater.bytes_read(), Err(Error::ClosedState)));
    assert!(matches!(deflater.bytes_written(), Err(Error::ClosedState)));
    assert!(matches!(deflater.set_input_all(sample(10)), Err(Error::ClosedState)));
    assert!(matches!(deflater.set_dictionary_all(b"dict"), Err(Error::ClosedState)));
    assert!(matches!(deflater.set_level(1), Err(Error::ClosedState)));
    assert!(matches!(deflater.finish(), Err(Error::ClosedState)));
    assert!(matches!(deflater.reset(), Err(Error::ClosedState)));
    assert!(!deflater.finished());
    assert!(deflater.needs_input());
}

#[test]
fn should_reset_to_new_stream() {
    let deflater = Deflater::with_level(BEST_SPEED, false).expect("create deflater");
    let mut output = Vec::new();
    deflater.set_input_all(sample(1_000)).expect("set input");
    drain(&deflater, &mut output, 64, FlushMode::NoFlush);
    finish(&deflater, &mut output, 64);
    assert!(deflater.bytes_written().unwrap() > 0);

    //Left over input is dropped
    deflater.set_input_all(sample(10)).expect("set input");
    deflater.reset().expect("reset");
    assert_eq!(deflater.lifecycle(), Lifecycle::Open);
    assert!(deflater.needs_input());
    assert_eq!(deflater.bytes_read().unwrap(), 0);
    assert_eq!(deflater.bytes_written().unwrap(), 0);
    assert_eq!(deflater.level(), BEST_SPEED);
    assert_eq!(deflater.checksum().unwrap(), 1);

    let data = sample(2_000);
    output.clear();
    deflater.set_input_all(data.clone()).expect("set input");
    drain(&deflater, &mut output, 64, FlushMode::NoFlush);
    let produced = finish(&deflater, &mut output, 64);
    assert!(produced > 0);
    assert_eq!(inflate_zlib(&output), data);
}

#[test]
fn should_drop_unconsumed_input_on_set_input() {
    let deflater = Deflater::new().expect("create deflater");
    let mut output = Vec::new();
    deflater.set_input_all(b"lost".to_vec()).expect("set input");
    deflater.set_input_all(b"kept".to_vec()).expect("set input");
    drain(&deflater, &mut output, 64, FlushMode::NoFlush);
    finish(&deflater, &mut output, 64);

    assert_eq!(deflater.bytes_read().unwrap(), 4);
    assert_eq!(inflate_zlib(&output), b"kept");
}

#[test]
fn should_allow_counter_reads_from_other_thread() {
    let data = sample(200_000);
    let deflater = Deflater::new().expect("create deflater");

    std::thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut last = 0;
            while !deflater.finished() {
                let read = deflater.bytes_read().expect("bytes read");
                assert!(read >= last);
                last = read;
                std::thread::yield_now();
            }
            last
        });

        let mut output = Vec::new();
        for chunk in data.chunks(10_000) {
            deflater.set_input_all(chunk.to_vec()).expect("set input");
            drain(&deflater, &mut output, 1024, FlushMode::NoFlush);
        }
        finish(&deflater, &mut output, 1024);
        assert_eq!(inflate_zlib(&output), data);

        assert!(reader.join().expect("join reader") <= data.len() as u64);
    });
}
