//! 解码器 trait 定义.
//!
//! 所有解码器实现必须实现 `Decoder` trait.

use ying_core::YingResult;

use crate::codec_id::CodecId;
use crate::codec_parameters::CodecParameters;
use crate::frame::Frame;
use crate::packet::Packet;

/// 解码器 trait
///
/// 定义了解码器的统一接口.
///
/// 解码流程:
/// 1. 调用 `open()` 传入容器提取的参数
/// 2. 调用 `send_packet()` 送入压缩数据
/// 3. 调用 `receive_frame()` 取出解码后的帧, 直到返回 `NeedMoreData`
///    (一个 Bink 音频包可以解出多个子块帧)
/// 4. 重复 2-3 直到所有数据处理完毕
///
/// Bink 的帧必须严格按编码顺序送入: 视频帧依赖前一帧的平面缓冲,
/// 音频包依赖前一个包留下的重叠窗口.
pub trait Decoder: Send {
    /// 获取解码器标识
    fn codec_id(&self) -> CodecId;

    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 使用参数配置解码器
    ///
    /// 必须在首次 `send_packet()` 之前调用.
    fn open(&mut self, params: &CodecParameters) -> YingResult<()>;

    /// 送入一个压缩数据包进行解码
    ///
    /// # 返回
    /// - `Ok(())`: 数据包已接受
    /// - `Err(YingError::NeedMoreData)`: 内部缓冲区已满, 需要先取出帧
    fn send_packet(&mut self, packet: &Packet) -> YingResult<()>;

    /// 从解码器取出一帧解码数据
    ///
    /// # 返回
    /// - `Ok(frame)`: 成功取出一帧
    /// - `Err(YingError::NeedMoreData)`: 需要送入更多数据包
    fn receive_frame(&mut self) -> YingResult<Frame>;

    /// 刷新解码器, 清空内部状态
    ///
    /// 用于 seek 或 reset 后重置解码器: 丢弃参考帧与重叠窗口,
    /// 使下一个送入的关键帧从干净状态开始.
    fn flush(&mut self);
}
