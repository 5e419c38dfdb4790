//! 解码流程集成测试: 用合成码流驱动公开 API.

use m4v::codec::decoders::mpeg4::synth::StreamBuilder;
use m4v::codec::diagnostics::{DiagnosticEvent, SharedCollector};
use m4v::codec::{DecodeFlags, Frame, Mpeg4Decoder, Packet, PictureType, VideoFrame};
use m4v::core::M4vError;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn luma_at(frame: &VideoFrame, x: usize, y: usize) -> u8 {
    frame.sample(0, x, y).expect("采样越界")
}

fn decode_all(decoder: &mut Mpeg4Decoder, packets: &[Vec<u8>]) -> Vec<VideoFrame> {
    let mut frames = Vec::new();
    for packet in packets {
        let decoded = decoder.decode(packet, DecodeFlags::empty()).expect("解码失败");
        frames.extend(decoded.outcome.into_picture());
    }
    frames.extend(decoder.flush(DecodeFlags::empty()).into_picture());
    frames
}

#[test]
fn test_单宏块帧内图像() {
    let mut builder = StreamBuilder::new(16, 16).low_delay(true);
    let data = builder.vol().intra_vop(0, 37).take();

    let mut decoder = Mpeg4Decoder::new();
    let frame = decoder
        .decode(&data, DecodeFlags::empty())
        .unwrap()
        .outcome
        .into_picture()
        .expect("低延迟码流应立即输出");

    assert_eq!((frame.width, frame.height), (16, 16));
    assert_eq!(frame.linesize, [16, 8, 8]);
    let total: usize = frame.data.iter().map(Vec::len).sum();
    assert_eq!(Some(total), frame.pixel_format.frame_size(16, 16));
    assert!(frame.data[0].iter().all(|&v| v == 37));
    assert!(frame.data[1].iter().all(|&v| v == 128));
    assert!(frame.data[2].iter().all(|&v| v == 128));
    assert_eq!(frame.picture_type, PictureType::I);
}

#[test]
fn test_ipb输出顺序() {
    init_logger();
    let mut builder = StreamBuilder::new(32, 32);
    let packets = vec![
        builder.vol().intra_vop(0, 80).take(),
        builder.intra_vop(2, 180).take(),
        builder.direct_b_vop(1).take(),
    ];

    let mut decoder = Mpeg4Decoder::new();
    let frames = decode_all(&mut decoder, &packets);
    let types: Vec<_> = frames.iter().map(|f| f.picture_type).collect();
    assert_eq!(types, vec![PictureType::I, PictureType::B, PictureType::I]);
    let lumas: Vec<_> = frames.iter().map(|f| luma_at(f, 12, 20)).collect();
    assert_eq!(lumas, vec![80, 130, 180]);
}

#[test]
fn test_跳过p帧后的b帧复制前向参考() {
    let mut builder = StreamBuilder::new(32, 16);
    let packets = vec![
        builder.vol().intra_vop(0, 90).take(),
        builder.skipped_p_vop(2).take(),
        // 共位宏块全部跳过, B 帧不读宏块数据
        builder.direct_b_vop(1).take(),
    ];

    let mut decoder = Mpeg4Decoder::new();
    let frames = decode_all(&mut decoder, &packets);
    let types: Vec<_> = frames.iter().map(|f| f.picture_type).collect();
    assert_eq!(types, vec![PictureType::I, PictureType::B, PictureType::P]);
    assert!(frames.iter().all(|f| luma_at(f, 31, 15) == 90));
}

#[test]
fn test_低延迟按解码顺序输出() {
    let mut builder = StreamBuilder::new(32, 16).low_delay(true);
    let packets = vec![builder.vol().intra_vop(0, 50).take(), builder.skipped_p_vop(1).take()];

    let mut decoder = Mpeg4Decoder::new();
    let frames = decode_all(&mut decoder, &packets);
    let types: Vec<_> = frames.iter().map(|f| f.picture_type).collect();
    assert_eq!(types, vec![PictureType::I, PictureType::P]);
}

#[test]
fn test_任意截断不崩溃() {
    init_logger();
    let mut builder = StreamBuilder::new(48, 32);
    let vol = builder.vol().take();
    let picture = builder.intra_vop(0, 200).take();

    for len in 0..picture.len() {
        let mut decoder = Mpeg4Decoder::new();
        decoder.attach(&vol).unwrap();
        match decoder.decode(&picture[..len], DecodeFlags::empty()) {
            Ok(decoded) => assert!(decoded.consumed <= len),
            Err(e) => assert!(
                matches!(e, M4vError::TruncatedStream { .. }),
                "截断到 {} 字节时的错误: {}",
                len,
                e
            ),
        }
    }
}

#[test]
fn test_视频包重置预测() {
    init_logger();
    let mut builder = StreamBuilder::new(48, 32).low_delay(true).resync_markers(true);
    let data = builder.vol().intra_vop_in_packets(0, 20, &[1, 4]).take();

    let collector = SharedCollector::new();
    let mut decoder = Mpeg4Decoder::new();
    decoder.set_diagnostics(Box::new(collector.clone()));
    let frame = decoder
        .decode(&data, DecodeFlags::empty())
        .unwrap()
        .outcome
        .into_picture()
        .unwrap();

    for mb_y in 0..2 {
        for mb_x in 0..3 {
            assert_eq!(luma_at(&frame, mb_x * 16 + 7, mb_y * 16 + 7), 20, "宏块 ({}, {})", mb_x, mb_y);
        }
    }
    let markers: Vec<_> = collector
        .take()
        .into_iter()
        .filter_map(|e| match e {
            DiagnosticEvent::ResyncMarker { mb_index } => Some(mb_index),
            _ => None,
        })
        .collect();
    assert_eq!(markers, vec![1, 4]);
}

#[test]
fn test_decoder_trait驱动() {
    let registry = m4v::default_codec_registry();
    let mut decoder = registry.create_decoder(m4v::codec::CodecId::Mpeg4).unwrap();

    let mut builder = StreamBuilder::new(32, 32);
    let config = builder.vol().take();
    let mut stream = builder.intra_vop(0, 100).take();
    stream.extend(builder.intra_vop(2, 156).take());
    stream.extend(builder.direct_b_vop(1).take());

    decoder
        .open(&m4v::codec::CodecParameters::new(m4v::codec::CodecId::Mpeg4, config))
        .unwrap();
    decoder.send_packet(&Packet::from_data(bytes::Bytes::from(stream))).unwrap();
    decoder.send_packet(&Packet::empty()).unwrap();

    let mut lumas = Vec::new();
    loop {
        match decoder.receive_frame() {
            Ok(Frame::Video(frame)) => lumas.push(luma_at(&frame, 0, 0)),
            Err(M4vError::Eof) => break,
            Err(e) => panic!("意外错误: {}", e),
        }
    }
    assert_eq!(lumas, vec![100, 128, 156]);
}

#[test]
fn test_低延迟时间戳换算到vol时间基() {
    let mut builder = StreamBuilder::new(16, 16).low_delay(true);
    let config = builder.vol().take();
    let picture = builder.intra_vop(0, 64).take();

    let mut decoder = m4v::default_codec_registry()
        .create_decoder(m4v::codec::CodecId::Mpeg4)
        .unwrap();
    decoder
        .open(&m4v::codec::CodecParameters::new(m4v::codec::CodecId::Mpeg4, config))
        .unwrap();

    let packet = Packet::from_data(picture).with_pts(2000, m4v::core::Rational::new(1, 1000));
    decoder.send_packet(&packet).unwrap();

    let Ok(Frame::Video(frame)) = decoder.receive_frame() else {
        panic!("低延迟码流应立即输出");
    };
    assert_eq!(frame.time_base, m4v::core::Rational::new(1, 30));
    assert_eq!(frame.pts, 60);
}

#[test]
fn test_断点包之后的b帧按缺参考处理() {
    init_logger();
    let mut builder = StreamBuilder::new(32, 32);
    let config = builder.vol().take();
    let first = builder.intra_vop(0, 100).take();
    let second = builder.intra_vop(2, 156).take();
    let bidir = builder.direct_b_vop(1).take();

    let mut decoder = m4v::default_codec_registry()
        .create_decoder(m4v::codec::CodecId::Mpeg4)
        .unwrap();
    decoder
        .open(&m4v::codec::CodecParameters::new(m4v::codec::CodecId::Mpeg4, config))
        .unwrap();
    decoder.send_packet(&Packet::from_data(first)).unwrap();
    decoder.send_packet(&Packet::from_data(second)).unwrap();
    decoder.send_packet(&Packet::from_data(bidir).with_discontinuity()).unwrap();
    decoder.send_packet(&Packet::empty()).unwrap();

    let mut frames = Vec::new();
    while let Ok(Frame::Video(frame)) = decoder.receive_frame() {
        frames.push((frame.picture_type, luma_at(&frame, 5, 5)));
    }
    assert_eq!(
        frames,
        vec![(PictureType::I, 100), (PictureType::B, 0), (PictureType::I, 156)]
    );
}
