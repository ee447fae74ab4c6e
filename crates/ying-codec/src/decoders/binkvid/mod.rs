//! Bink 1 视频解码器
//!
//! 实现 Bink 1 (修订版 'c'-'i', 不含 'b') 的逐帧视频解码:
//!
//! - 每帧按 (Alpha), Y, U, V 顺序解码各平面; 修订版晚于 'c' 的文件
//!   U/V 槽位互换, 晚于 'd' 的文件在平面组前各跳过 32 位.
//! - 每个平面由 8x8 块组成, 行首批量解码九条参数流, 再按块类型分派:
//!   SKIP/SCALED/MOTION/RUN/RESIDUE/INTRA/FILL/INTER/PATTERN/RAW.
//! - 新帧的平面以上一帧内容为初值, 因此 SKIP 为空操作,
//!   位移为零的运动补偿可以短路.
//! - 每个平面解码完毕后码流对齐到 32 位边界.
//!
//! ## 模块结构
//!
//! - `tables`: 静态数据 (扫描顺序, 前缀码表, RUN 扫描路径, 量化矩阵)
//! - `trees`: 前缀码查表解码与符号重排
//! - `bundles`: 九条参数流的行级解码
//! - `vm`: 系数/残差位平面扫描
//! - `dsp`: 整数 AAN IDCT 与像素块操作

mod bundles;
mod dsp;
mod tables;
mod trees;
mod vm;

use log::{debug, trace};
use ying_core::bitreader::BitReader;
use ying_core::{PixelFormat, YingError, YingResult};

use crate::codec_id::CodecId;
use crate::codec_parameters::{CodecParameters, CodecParamsType};
use crate::decoder::Decoder;
use crate::frame::{Frame, VideoFrame};
use crate::packet::Packet;

use bundles::{calc_len_bits, Bundle};
use tables::{BINK_INTER_QUANT, BINK_INTRA_QUANT, BINK_PATTERNS};
use trees::Tree;
use vm::CoeffScan;

/// 块类型
const SKIP_BLOCK: u8 = 0;
const SCALED_BLOCK: u8 = 1;
const MOTION_BLOCK: u8 = 2;
const RUN_BLOCK: u8 = 3;
const RESIDUE_BLOCK: u8 = 4;
const INTRA_BLOCK: u8 = 5;
const FILL_BLOCK: u8 = 6;
const INTER_BLOCK: u8 = 7;
const PATTERN_BLOCK: u8 = 8;
const RAW_BLOCK: u8 = 9;

/// 视频标志位
const FLAG_ALPHA: u32 = 1 << 20;
const FLAG_GRAY: u32 = 1 << 17;

/// 单个平面的几何信息
#[derive(Default, Clone, Copy)]
struct PlaneGeom {
    /// 编码宽度
    width: usize,
    /// 编码高度
    height: usize,
    /// 内部缓冲宽度 (对齐到 8, 兼作 stride)
    aligned_w: usize,
    /// 内部缓冲高度 (对齐到 8)
    aligned_h: usize,
}

impl PlaneGeom {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            aligned_w: (width + 7) & !7,
            aligned_h: (height + 7) & !7,
        }
    }
}

/// Bink 1 视频解码器
pub struct BinkVideoDecoder {
    width: u32,
    height: u32,
    /// 魔数第 4 字节, ASCII 修订版
    revision: u8,
    has_alpha: bool,
    is_gray: bool,
    swap_uv: bool,
    /// 头部声明的缩放模式 (0-15), 本解码器不做重采样, 仅透传
    scaling: u8,
    pixel_format: PixelFormat,
    opened: bool,

    /// 平面几何: [Y, U, V, A]
    plane_geom: [PlaneGeom; 4],
    /// 当前帧平面 (对齐缓冲)
    cur_planes: [Vec<u8>; 4],
    /// 上一帧平面 (对齐缓冲), 新帧以其内容为初值
    prev_planes: [Vec<u8>; 4],

    btype: Bundle<u8>,
    sbtype: Bundle<u8>,
    colors: Bundle<u8>,
    pattern: Bundle<u8>,
    xoff: Bundle<i8>,
    yoff: Bundle<i8>,
    intradc: Bundle<i16>,
    interdc: Bundle<i16>,
    run: Bundle<u8>,

    /// 颜色高半字节的 16 棵辅助重排树
    colhi_tree: [Tree; 16],
    /// 颜色高半字节的上一个值
    col_last: u8,
    /// 系数/残差扫描机 (构造时分配, 块间复用)
    scanner: CoeffScan,

    /// 待取出的已解码帧
    pending: Option<VideoFrame>,
    /// 已解码帧计数
    frame_count: u64,
}

impl BinkVideoDecoder {
    pub fn create() -> YingResult<Box<dyn Decoder>> {
        Ok(Box::new(Self::new()))
    }

    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            revision: 0,
            has_alpha: false,
            is_gray: false,
            swap_uv: false,
            scaling: 0,
            pixel_format: PixelFormat::Yuv420p,
            opened: false,
            plane_geom: [PlaneGeom::default(); 4],
            cur_planes: Default::default(),
            prev_planes: Default::default(),
            btype: Bundle::default(),
            sbtype: Bundle::default(),
            colors: Bundle::default(),
            pattern: Bundle::default(),
            xoff: Bundle::default(),
            yoff: Bundle::default(),
            intradc: Bundle::default(),
            interdc: Bundle::default(),
            run: Bundle::default(),
            colhi_tree: [Tree::default(); 16],
            col_last: 0,
            scanner: CoeffScan::new(),
            pending: None,
            frame_count: 0,
        }
    }

    /// 配置各平面几何并分配参数流缓冲
    fn setup_planes(&mut self) {
        let (w, h) = (self.width as usize, self.height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        self.plane_geom = [
            PlaneGeom::new(w, h),
            PlaneGeom::new(cw, ch),
            PlaneGeom::new(cw, ch),
            PlaneGeom::new(w, h),
        ];
        let nplanes = if self.has_alpha { 4 } else { 3 };
        for p in 0..4 {
            let size = if p < nplanes {
                self.plane_geom[p].aligned_w * self.plane_geom[p].aligned_h
            } else {
                0
            };
            self.cur_planes[p] = vec![0; size];
            self.prev_planes[p] = vec![0; size];
        }
        // 参数流缓冲按亮度平面的最坏情况分配, 各平面共用
        let bw = w.div_ceil(8);
        let bh = h.div_ceil(8);
        let cap = bw * bh * 64;
        self.btype.alloc(cap);
        self.sbtype.alloc(cap);
        self.colors.alloc(cap);
        self.pattern.alloc(cap);
        self.xoff.alloc(cap);
        self.yoff.alloc(cap);
        self.intradc.alloc(cap);
        self.interdc.alloc(cap);
        self.run.alloc(cap);
    }

    /// 设置本平面九条参数流的行长度位宽
    fn init_bundle_lengths(&mut self, width: usize, bw: usize) {
        let w = (width.max(8) + 7) & !7;
        self.btype.bits = calc_len_bits(w >> 3);
        self.sbtype.bits = calc_len_bits((w >> 3).div_ceil(2));
        self.colors.bits = calc_len_bits(bw * 64);
        self.pattern.bits = calc_len_bits(bw * 8);
        self.xoff.bits = calc_len_bits(w >> 3);
        self.yoff.bits = calc_len_bits(w >> 3);
        self.intradc.bits = calc_len_bits(w >> 3);
        self.interdc.bits = calc_len_bits(w >> 3);
        self.run.bits = calc_len_bits(bw * 48);
    }

    /// 平面开头: 读取各参数流的码表声明
    ///
    /// DC 流没有码表, 仅重置游标. 颜色流额外声明 16 棵高半字节树,
    /// 并把高半字节上一个值归零.
    fn read_bundles_desc(&mut self, br: &mut BitReader) {
        self.btype.read_desc(br);
        self.sbtype.read_desc(br);
        for tree in self.colhi_tree.iter_mut() {
            tree.read_desc(br);
        }
        self.col_last = 0;
        self.colors.read_desc(br);
        self.pattern.read_desc(br);
        self.xoff.read_desc(br);
        self.yoff.read_desc(br);
        self.intradc.reset();
        self.interdc.reset();
        self.run.read_desc(br);
    }

    /// 行首: 按码流顺序读取九条参数流的本行数据
    fn read_bundles(&mut self, br: &mut BitReader) -> YingResult<()> {
        let remap = self.revision < b'e';
        self.btype.read_block_types(br)?;
        self.sbtype.read_block_types(br)?;
        self.colors
            .read_colors(br, &self.colhi_tree, &mut self.col_last, remap)?;
        self.pattern.read_patterns(br)?;
        self.xoff.read_motion_values(br)?;
        self.yoff.read_motion_values(br)?;
        self.intradc.read_dcs(br, false)?;
        self.interdc.read_dcs(br, true)?;
        self.run.read_runs(br)?;
        Ok(())
    }

    /// 校验运动补偿源块落在平面内, 返回源偏移
    fn motion_offset(
        geom: PlaneGeom,
        bx: usize,
        by: usize,
        dst_off: usize,
        xoff: i8,
        yoff: i8,
    ) -> YingResult<usize> {
        let x = (bx * 8) as isize + xoff as isize;
        let y = (by * 8) as isize + yoff as isize;
        if x < 0
            || x + 8 > geom.aligned_w as isize
            || y < 0
            || y + 8 > geom.aligned_h as isize
        {
            return Err(YingError::InvalidData(format!(
                "运动位移越界: 块 ({bx}, {by}) 位移 ({xoff}, {yoff})"
            )));
        }
        Ok((dst_off as isize + xoff as isize + yoff as isize * geom.aligned_w as isize) as usize)
    }

    /// RUN 块: 按扫描路径以游程填充 8x8 块
    fn decode_run_block(&mut self, br: &mut BitReader, oblock: &mut [u8; 64]) -> YingResult<()> {
        let scan = &BINK_PATTERNS[br.read_bits(4) as usize];
        let mut idx = 0usize;
        while idx < 63 {
            let run = self.run.next()? as usize + 1;
            if idx + run > 64 {
                return Err(YingError::InvalidData("RUN 块游程越过块尾".into()));
            }
            if br.read_bool() {
                let val = self.colors.next()?;
                for &pos in &scan[idx..idx + run] {
                    oblock[pos as usize] = val;
                }
                idx += run;
            } else {
                for _ in 0..run {
                    oblock[scan[idx] as usize] = self.colors.next()?;
                    idx += 1;
                }
            }
        }
        // 63 个位置之后剩下的最后一格单独编码
        if idx == 63 {
            oblock[scan[63] as usize] = self.colors.next()?;
        }
        Ok(())
    }

    /// PATTERN 块: 两色调色板 + 每行 8 位掩码
    fn decode_pattern_block(&mut self, oblock: &mut [u8; 64]) -> YingResult<()> {
        let palette = [self.colors.next()?, self.colors.next()?];
        for row in 0..8 {
            let mask = self.pattern.next()? as usize;
            for col in 0..8 {
                oblock[row * 8 + col] = palette[(mask >> col) & 1];
            }
        }
        Ok(())
    }

    /// 解码并写入一个块; `scaled` 时输出 2x 放大的 16x16
    #[allow(clippy::too_many_arguments)]
    fn handle_block(
        &mut self,
        br: &mut BitReader,
        geom: PlaneGeom,
        bx: usize,
        by: usize,
        dst: &mut [u8],
        prev: &[u8],
        off: usize,
        btype: u8,
        scaled: bool,
    ) -> YingResult<()> {
        let stride = geom.aligned_w;
        let mut oblock = [0u8; 64];
        let mut coeffs = [0i32; 64];
        // 放大块只允许自包含的子类型
        if scaled
            && !matches!(
                btype,
                RUN_BLOCK | INTRA_BLOCK | FILL_BLOCK | PATTERN_BLOCK | RAW_BLOCK
            )
        {
            return Err(YingError::InvalidData(format!(
                "放大块的子类型非法: {btype}"
            )));
        }
        match btype {
            SKIP_BLOCK => {
                // 平面初值即上一帧内容, 无需任何操作
            }
            SCALED_BLOCK => {
                // 放大块覆盖 16x16, 必须整体落在平面内
                if (bx + 2) * 8 > geom.aligned_w || (by + 2) * 8 > geom.aligned_h {
                    return Err(YingError::InvalidData(format!(
                        "放大块越界: ({bx}, {by})"
                    )));
                }
                let sub = self.sbtype.next()?;
                self.handle_block(br, geom, bx, by, dst, prev, off, sub, true)?;
            }
            MOTION_BLOCK => {
                let (mx, my) = (self.xoff.next()?, self.yoff.next()?);
                let src = Self::motion_offset(geom, bx, by, off, mx, my)?;
                // 位移为零时目标已持有相同像素
                if src != off {
                    dsp::copy_block(prev, dst, src, off, stride);
                }
            }
            RUN_BLOCK => {
                self.decode_run_block(br, &mut oblock)?;
                dsp::put_block(&oblock, dst, off, stride, scaled);
            }
            RESIDUE_BLOCK => {
                let (mx, my) = (self.xoff.next()?, self.yoff.next()?);
                let src = Self::motion_offset(geom, bx, by, off, mx, my)?;
                if src != off {
                    dsp::copy_block(prev, dst, src, off, stride);
                }
                self.scanner.read_residue(br, &mut coeffs)?;
                dsp::add_block(&coeffs, dst, off, stride);
            }
            INTRA_BLOCK => {
                coeffs[0] = i32::from(self.intradc.next()?);
                self.scanner
                    .read_dct_coefficients(br, &mut coeffs, &BINK_INTRA_QUANT)?;
                if !scaled {
                    dsp::idct_put(&coeffs, dst, off, stride);
                } else {
                    let mut pix = [0u8; 64];
                    dsp::idct_put(&coeffs, &mut pix, 0, 8);
                    dsp::put_block(&pix, dst, off, stride, true);
                }
            }
            FILL_BLOCK => {
                let val = self.colors.next()?;
                oblock = [val; 64];
                dsp::put_block(&oblock, dst, off, stride, scaled);
            }
            INTER_BLOCK => {
                let (mx, my) = (self.xoff.next()?, self.yoff.next()?);
                let src = Self::motion_offset(geom, bx, by, off, mx, my)?;
                if src != off {
                    dsp::copy_block(prev, dst, src, off, stride);
                }
                coeffs[0] = i32::from(self.interdc.next()?);
                self.scanner
                    .read_dct_coefficients(br, &mut coeffs, &BINK_INTER_QUANT)?;
                dsp::idct_add(&coeffs, dst, off, stride);
            }
            PATTERN_BLOCK => {
                self.decode_pattern_block(&mut oblock)?;
                dsp::put_block(&oblock, dst, off, stride, scaled);
            }
            RAW_BLOCK => {
                for v in oblock.iter_mut() {
                    *v = self.colors.next()?;
                }
                dsp::put_block(&oblock, dst, off, stride, scaled);
            }
            _ => {
                return Err(YingError::InvalidData(format!("未知块类型: {btype}")));
            }
        }
        Ok(())
    }

    /// 解码一个平面
    fn decode_plane(&mut self, br: &mut BitReader, plane: usize) -> YingResult<()> {
        let geom = self.plane_geom[plane];
        let bw = geom.width.div_ceil(8);
        let bh = geom.height.div_ceil(8);
        self.init_bundle_lengths(geom.width, bw);
        self.read_bundles_desc(br);

        let mut dst = std::mem::take(&mut self.cur_planes[plane]);
        let prev = std::mem::take(&mut self.prev_planes[plane]);
        let result = self.decode_plane_rows(br, geom, bw, bh, &mut dst, &prev);
        self.cur_planes[plane] = dst;
        self.prev_planes[plane] = prev;
        result?;

        br.align32();
        Ok(())
    }

    /// 逐块行解码平面内容
    fn decode_plane_rows(
        &mut self,
        br: &mut BitReader,
        geom: PlaneGeom,
        bw: usize,
        bh: usize,
        dst: &mut [u8],
        prev: &[u8],
    ) -> YingResult<()> {
        let stride = geom.aligned_w;
        let mut row_off = 0usize;
        for by in 0..bh {
            self.read_bundles(br)?;
            trace!("块行 {by}: 码流位置 {}", br.position());
            let mut bx = 0usize;
            while bx < bw {
                let btype = self.btype.next()?;
                if btype == SCALED_BLOCK && (by & 1) == 1 {
                    // 放大块在偶数行整体解码 16x16, 奇数行只前进不解码
                    bx += 2;
                    continue;
                }
                self.handle_block(br, geom, bx, by, dst, prev, row_off + bx * 8, btype, false)?;
                if btype == SCALED_BLOCK {
                    // 放大块横向覆盖两个块位
                    bx += 1;
                }
                bx += 1;
            }
            row_off += stride * 8;
        }
        Ok(())
    }

    /// 解码一帧: 平面顺序为 (Alpha), Y, U, V
    fn decode_frame(&mut self, packet: &Packet) -> YingResult<VideoFrame> {
        let data = packet.data.clone();
        let mut br = BitReader::new(&data);

        // 新帧以上一帧内容为初值
        for p in 0..4 {
            if !self.cur_planes[p].is_empty() {
                let prev = &self.prev_planes[p];
                self.cur_planes[p].copy_from_slice(prev);
            }
        }

        if self.has_alpha {
            if self.revision > b'd' {
                br.skip(32);
            }
            self.decode_plane(&mut br, 3)?;
        }
        if self.revision > b'd' {
            br.skip(32);
        }
        for plane in 0..3usize {
            // 灰度等短码流在亮度平面后耗尽, 色度保持初值
            if br.bits_left() == 0 {
                break;
            }
            let effective = if plane > 0 && self.swap_uv {
                plane ^ 3
            } else {
                plane
            };
            self.decode_plane(&mut br, effective)?;
        }

        // 当前帧成为下一帧的参考
        for p in 0..4 {
            std::mem::swap(&mut self.cur_planes[p], &mut self.prev_planes[p]);
        }

        let frame = self.export_frame(packet);
        self.frame_count += 1;
        debug!(
            "binkvid: 帧 {} 解码完成 ({}x{}, 关键帧 {})",
            self.frame_count, self.width, self.height, packet.is_keyframe
        );
        Ok(frame)
    }

    /// 从对齐平面裁剪出输出帧
    ///
    /// 解码结果此时在 `prev_planes` 中 (刚完成交换).
    fn export_frame(&self, packet: &Packet) -> VideoFrame {
        let mut frame = VideoFrame::new(self.width, self.height, self.pixel_format);
        let nplanes = self.pixel_format.plane_count() as usize;
        for p in 0..nplanes {
            let geom = self.plane_geom[p];
            let mut plane = vec![0u8; geom.width * geom.height];
            for row in 0..geom.height {
                let src = &self.prev_planes[p][row * geom.aligned_w..][..geom.width];
                plane[row * geom.width..][..geom.width].copy_from_slice(src);
            }
            frame.data[p] = plane;
            frame.linesize[p] = geom.width;
        }
        frame.pts = packet.pts;
        frame.time_base = packet.time_base;
        frame.duration = packet.duration;
        frame.is_keyframe = packet.is_keyframe;
        frame
    }
}

impl Default for BinkVideoDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for BinkVideoDecoder {
    fn codec_id(&self) -> CodecId {
        CodecId::BinkVideo
    }

    fn name(&self) -> &str {
        "binkvideo"
    }

    fn open(&mut self, params: &CodecParameters) -> YingResult<()> {
        let CodecParamsType::Video(ref vp) = params.params else {
            return Err(YingError::InvalidArgument(
                "binkvid 需要视频参数".into(),
            ));
        };
        if params.extra_data.len() < 8 {
            return Err(YingError::InvalidArgument(
                "binkvid 需要 8 字节 extradata (魔数 + 标志)".into(),
            ));
        }
        if vp.width == 0 || vp.height == 0 {
            return Err(YingError::InvalidArgument("画面尺寸非法".into()));
        }
        let flags = u32::from_le_bytes([
            params.extra_data[4],
            params.extra_data[5],
            params.extra_data[6],
            params.extra_data[7],
        ]);
        self.revision = params.extra_data[3];
        self.width = vp.width;
        self.height = vp.height;
        self.has_alpha = flags & FLAG_ALPHA != 0;
        self.is_gray = flags & FLAG_GRAY != 0;
        self.swap_uv = self.revision > b'c';
        self.scaling = ((flags >> 28) & 0xF) as u8;
        self.pixel_format = if self.has_alpha {
            PixelFormat::Yuva420p
        } else if self.is_gray {
            PixelFormat::Gray8
        } else {
            PixelFormat::Yuv420p
        };
        self.setup_planes();
        self.frame_count = 0;
        self.opened = true;
        debug!(
            "binkvid: 打开 {}x{}, 修订版 '{}', alpha={}, 灰度={}, UV 互换={}, 缩放={}",
            self.width,
            self.height,
            self.revision as char,
            self.has_alpha,
            self.is_gray,
            self.swap_uv,
            self.scaling
        );
        Ok(())
    }

    fn send_packet(&mut self, packet: &Packet) -> YingResult<()> {
        if !self.opened {
            return Err(YingError::InvalidArgument("解码器尚未打开".into()));
        }
        if packet.is_empty() {
            return Ok(());
        }
        if self.pending.is_some() {
            return Err(YingError::NeedMoreData);
        }
        let frame = self.decode_frame(packet)?;
        self.pending = Some(frame);
        Ok(())
    }

    fn receive_frame(&mut self) -> YingResult<Frame> {
        match self.pending.take() {
            Some(frame) => Ok(Frame::Video(frame)),
            None => Err(YingError::NeedMoreData),
        }
    }

    fn flush(&mut self) {
        self.pending = None;
        self.frame_count = 0;
        for plane in self.prev_planes.iter_mut() {
            plane.fill(0);
        }
        for plane in self.cur_planes.iter_mut() {
            plane.fill(0);
        }
    }
}
