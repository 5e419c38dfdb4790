//! m4v 解码器性能基准测试.
//!
//! 覆盖比特流读取、整帧帧内解码与 I/P/B 序列解码.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use m4v::codec::decoders::mpeg4::synth::StreamBuilder;
use m4v::codec::{DecodeFlags, Mpeg4Decoder};
use m4v::core::bitreader::BitReader;

/// CIF 尺寸的 VOL 与一帧 I-VOP
fn make_cif_intra() -> (Vec<u8>, Vec<u8>) {
    let mut builder = StreamBuilder::new(352, 288);
    let vol = builder.vol().take();
    let picture = builder.intra_vop(0, 120).take();
    (vol, picture)
}

fn bench_bitreader(c: &mut Criterion) {
    let data: Vec<u8> = (0..64 * 1024).map(|i| (i * 31 % 251) as u8).collect();
    c.bench_function("bitreader_read_7bit_64k", |b| {
        b.iter(|| {
            let mut reader = BitReader::new(black_box(&data));
            let mut sum = 0u32;
            while reader.bits_remaining() >= 7 {
                sum = sum.wrapping_add(reader.read_bits(7).unwrap_or(0));
            }
            sum
        });
    });
}

fn bench_intra_decode(c: &mut Criterion) {
    let (vol, picture) = make_cif_intra();
    c.bench_function("mpeg4_intra_decode_cif", |b| {
        let mut decoder = Mpeg4Decoder::new();
        decoder.attach(&vol).unwrap();
        b.iter(|| {
            let decoded = decoder.decode(black_box(&picture), DecodeFlags::empty()).unwrap();
            black_box(decoded.consumed)
        });
    });
}

fn bench_ipb_sequence(c: &mut Criterion) {
    let mut builder = StreamBuilder::new(352, 288);
    let vol = builder.vol().take();
    let packets = vec![
        builder.intra_vop(0, 80).take(),
        builder.intra_vop(2, 160).take(),
        builder.direct_b_vop(1).take(),
    ];

    c.bench_function("mpeg4_ipb_sequence_cif", |b| {
        b.iter(|| {
            let mut decoder = Mpeg4Decoder::new();
            decoder.attach(&vol).unwrap();
            let mut frames = 0;
            for packet in &packets {
                let decoded = decoder.decode(black_box(packet), DecodeFlags::empty()).unwrap();
                frames += usize::from(decoded.outcome.picture().is_some());
            }
            frames += usize::from(decoder.flush(DecodeFlags::empty()).picture().is_some());
            frames
        });
    });
}

criterion_group!(benches, bench_bitreader, bench_intra_decode, bench_ipb_sequence);
criterion_main!(benches);
