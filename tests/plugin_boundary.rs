//! 插件边界: 探测, 能力表, 配置数据挂载.

use m4v::codec::decoders::mpeg4::synth::StreamBuilder;
use m4v::codec::plugin::{self, ProbeResult};
use m4v::codec::{CodecId, DecodeFlags, Mpeg4Decoder};
use m4v::core::PixelFormat;

#[test]
fn test_探测与挂载一致() {
    let mut builder = StreamBuilder::new(352, 288);
    let config = builder.vol().take();

    assert_eq!(plugin::probe(CodecId::Mpeg4, &config), ProbeResult::Supported);
    assert_eq!(
        plugin::probe(CodecId::from_fourcc(b"XVID"), &config),
        ProbeResult::Supported
    );
    assert_eq!(plugin::probe(CodecId::from_fourcc(b"H264"), &config), ProbeResult::NotSupported);

    let mut decoder = Mpeg4Decoder::new();
    let layer = decoder.attach(&config).unwrap().unwrap();
    assert_eq!((layer.width, layer.height), (352, 288));
}

#[test]
fn test_能力表与输出帧一致() {
    let caps = plugin::capabilities();
    assert_eq!(caps.output_format, PixelFormat::Yuv420p);
    assert_eq!(caps.min_reference_buffers, 2);
    assert_eq!(caps.reorder_delay, 1);

    let mut builder = StreamBuilder::new(16, 16).low_delay(true);
    let data = builder.vol().intra_vop(0, 10).take();
    let mut decoder = Mpeg4Decoder::new();
    let frame = decoder
        .decode(&data, DecodeFlags::empty())
        .unwrap()
        .outcome
        .into_picture()
        .unwrap();
    assert_eq!(frame.pixel_format, caps.output_format);
}

#[test]
fn test_分离后需要重新挂载() {
    let mut builder = StreamBuilder::new(32, 32);
    let config = builder.vol().take();
    let picture = builder.intra_vop(0, 100).take();

    let mut decoder = Mpeg4Decoder::new();
    decoder.attach(&config).unwrap();
    decoder.decode(&picture, DecodeFlags::empty()).unwrap();
    decoder.detach();
    assert!(decoder.decode(&picture, DecodeFlags::empty()).is_err());
}

#[test]
fn test_按fourcc打开解码器() {
    use m4v::codec::{CodecParameters, Decoder, DecoderOptions};

    let mut builder = StreamBuilder::new(32, 32);
    let config = builder.vol().take();
    let options = DecoderOptions {
        fixed_width: Some(32),
        fixed_height: Some(32),
        ..Default::default()
    };

    let mut decoder = Mpeg4Decoder::new();
    let params = CodecParameters::from_fourcc(b"DX50", config.clone()).with_options(options.clone());
    decoder.open(&params).unwrap();
    assert_eq!(decoder.options(), &options);
    assert_eq!(decoder.dimensions(), Some((32, 32)));

    let params = CodecParameters::from_fourcc(b"avc1", config);
    assert!(decoder.open(&params).is_err());
}
