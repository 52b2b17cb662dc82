//! TrueType/OpenType font subsetting.
//!
//! The subsetter reads a TrueType-flavoured font program from a byte device,
//! computes the transitive glyph closure over compound glyphs, renumbers the
//! surviving glyph identifiers, and emits a standalone, checksum-correct
//! font program containing exactly the closure. Per PDF 32000-1 §9.9 the
//! `cmap` table is dropped along with every table a CIDFont does not need.

use crate::error::{PdfError, Result};
use crate::io::{read_exact, InputDevice};
use bitflags::bitflags;
use std::collections::HashMap;

const TAG_HEAD: [u8; 4] = *b"head";
const TAG_HHEA: [u8; 4] = *b"hhea";
const TAG_LOCA: [u8; 4] = *b"loca";
const TAG_MAXP: [u8; 4] = *b"maxp";
const TAG_GLYF: [u8; 4] = *b"glyf";
const TAG_HMTX: [u8; 4] = *b"hmtx";
const TAG_POST: [u8; 4] = *b"post";
const TAG_CVT: [u8; 4] = *b"cvt ";
const TAG_FPGM: [u8; 4] = *b"fpgm";
const TAG_PREP: [u8; 4] = *b"prep";

// Compound glyph component flags
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_TWO_BY_TWO: u16 = 0x0080;

bitflags! {
    /// Tables that must be present in the source font.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct ReqTables: u8 {
        const HEAD = 0x01;
        const HHEA = 0x02;
        const LOCA = 0x04;
        const MAXP = 0x08;
        const GLYF = 0x10;
        const HMTX = 0x20;
    }
}

/// A table directory entry of the source font.
#[derive(Debug, Clone)]
struct TableRecord {
    tag: [u8; 4],
    offset: u32,
    length: u32,
}

/// One glyph of the source font, located through `loca`.
#[derive(Debug, Default)]
struct GlyphRecord {
    /// Absolute offset of the glyph data in the source font.
    offset: u32,
    length: u32,
    /// Absolute offset of the first component header (compound glyphs).
    adv_offset: u32,
    is_compound: bool,
    /// Byte offset of each component-GID field relative to the glyph start,
    /// with the renumbered GID to write there.
    components: Vec<(u32, u16)>,
}

/// Builds a subset font program from a source font and a set of required
/// glyph identifiers.
pub struct TrueTypeSubsetter<'a> {
    device: &'a mut dyn InputDevice,
    tables: Vec<TableRecord>,
    glyph_count: u16,
    metrics_count: u16,
    long_loca: bool,
    glyphs: HashMap<u16, GlyphRecord>,
    ordered_gids: Vec<u16>,
}

impl<'a> TrueTypeSubsetter<'a> {
    /// Subset the font program in `device` to the transitive closure of
    /// `gids`. Glyph 0 is always included. Returns the complete subset font
    /// program.
    pub fn build_subset(device: &'a mut dyn InputDevice, gids: &[u16]) -> Result<Vec<u8>> {
        let mut subsetter = TrueTypeSubsetter {
            device,
            tables: Vec::new(),
            glyph_count: 0,
            metrics_count: 0,
            long_loca: false,
            glyphs: HashMap::new(),
            ordered_gids: Vec::new(),
        };
        subsetter.init()?;
        subsetter.load_glyphs(gids)?;
        subsetter.write_tables()
    }

    fn init(&mut self) -> Result<()> {
        let scaler = self.read_u32_at(0)?;
        match scaler {
            0x00010000 | 0x74727565 => {} // 1.0 and 'true'
            0x4F54544F => {
                return Err(PdfError::UnsupportedFontFormat(
                    "CFF-flavoured OpenType font".to_string(),
                ))
            }
            0x74746366 => {
                return Err(PdfError::UnsupportedFontFormat(
                    "TrueType collection".to_string(),
                ))
            }
            other => {
                return Err(PdfError::UnsupportedFontFormat(format!(
                    "unrecognized scaler type 0x{:08X}",
                    other
                )))
            }
        }

        let table_count = self.read_u16_at(4)?;
        let mut present = ReqTables::empty();
        for i in 0..table_count {
            let entry = 12 + 16 * i as u64;
            let mut tag = [0u8; 4];
            self.device.seek(entry)?;
            read_exact(self.device, &mut tag)?;
            let offset = self.read_u32_at(entry + 8)?;
            let mut length = self.read_u32_at(entry + 12)?;

            let keep = match tag {
                TAG_HEAD => {
                    present |= ReqTables::HEAD;
                    true
                }
                TAG_HHEA => {
                    present |= ReqTables::HHEA;
                    true
                }
                TAG_LOCA => {
                    present |= ReqTables::LOCA;
                    true
                }
                TAG_MAXP => {
                    present |= ReqTables::MAXP;
                    true
                }
                TAG_GLYF => {
                    present |= ReqTables::GLYF;
                    true
                }
                TAG_HMTX => {
                    present |= ReqTables::HMTX;
                    true
                }
                TAG_CVT | TAG_FPGM | TAG_PREP => true,
                TAG_POST => {
                    // Rewritten to format 3: only the 32-byte header survives
                    length = 32;
                    self.read_u32_at(entry + 12)? >= 32
                }
                // Everything else, cmap included, is dropped
                _ => false,
            };
            if keep {
                self.tables.push(TableRecord {
                    tag,
                    offset,
                    length,
                });
            }
        }

        if present != ReqTables::all() {
            return Err(PdfError::UnsupportedFontFormat(
                "required TrueType table missing".to_string(),
            ));
        }

        let maxp = self.table_offset(TAG_MAXP)?;
        self.glyph_count = self.read_u16_at(maxp as u64 + 4)?;

        let hhea = self.table_offset(TAG_HHEA)?;
        self.metrics_count = self.read_u16_at(hhea as u64 + 34)?;
        if self.metrics_count == 0 {
            return Err(PdfError::UnsupportedFontFormat(
                "font declares no horizontal metrics".to_string(),
            ));
        }

        let head = self.table_offset(TAG_HEAD)?;
        self.long_loca = self.read_u16_at(head as u64 + 50)? != 0;
        Ok(())
    }

    fn table_offset(&self, tag: [u8; 4]) -> Result<u32> {
        self.tables
            .iter()
            .find(|table| table.tag == tag)
            .map(|table| table.offset)
            .ok_or_else(|| {
                PdfError::InternalLogic(format!(
                    "table {} missing",
                    String::from_utf8_lossy(&tag)
                ))
            })
    }

    /// Load the closure of glyph 0 plus `gids`, then fix the renumbering of
    /// every compound glyph's component fields.
    fn load_glyphs(&mut self, gids: &[u16]) -> Result<()> {
        let glyf = self.table_offset(TAG_GLYF)?;
        let loca = self.table_offset(TAG_LOCA)?;

        // Glyph 0 is always part of a subset
        let mut discovered = Vec::new();
        self.load_gid(glyf, loca, 0, &mut discovered)?;
        for &gid in gids {
            self.load_gid(glyf, loca, gid, &mut discovered)?;
        }

        // Output order: glyph 0, the requested GIDs in caller order, then
        // compound descendants in the order the closure discovered them.
        let mut index_map: HashMap<u16, u16> = HashMap::new();
        index_map.insert(0, 0);
        self.ordered_gids.push(0);
        for &gid in gids {
            if !index_map.contains_key(&gid) {
                index_map.insert(gid, index_map.len() as u16);
                self.ordered_gids.push(gid);
            }
        }
        for &gid in &discovered {
            if !index_map.contains_key(&gid) {
                index_map.insert(gid, index_map.len() as u16);
                self.ordered_gids.push(gid);
            }
        }

        // Second walk over each compound glyph: remember where every
        // component-GID field sits so the writer can overwrite it.
        for gid in self.ordered_gids.clone() {
            let (glyph_offset, glyph_length, adv_offset, is_compound) = {
                let record = self.glyph(gid)?;
                (
                    record.offset,
                    record.length,
                    record.adv_offset,
                    record.is_compound,
                )
            };
            if !is_compound {
                continue;
            }
            let mut components = Vec::new();
            let mut rel = 0u32;
            loop {
                let header = adv_offset + rel;
                if header + 4 > glyph_offset + glyph_length {
                    return Err(PdfError::InternalLogic(
                        "compound component past glyph end".to_string(),
                    ));
                }
                let flags = self.read_u16_at(header as u64)?;
                let component_gid = self.read_u16_at(header as u64 + 2)?;
                let new_gid = *index_map.get(&component_gid).ok_or_else(|| {
                    PdfError::InternalLogic("component glyph missing from closure".to_string())
                })?;
                components.push((header + 2 - glyph_offset, new_gid));
                match advance_compound_offset(rel, flags) {
                    Some(next) => rel = next,
                    None => break,
                }
            }
            match self.glyphs.get_mut(&gid) {
                Some(record) => record.components = components,
                None => {
                    return Err(PdfError::InternalLogic(
                        "ordered glyph without record".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    fn load_gid(
        &mut self,
        glyf: u32,
        loca: u32,
        gid: u16,
        discovered: &mut Vec<u16>,
    ) -> Result<()> {
        if gid >= self.glyph_count {
            return Err(PdfError::InternalLogic(format!(
                "GID {} out of range ({} glyphs)",
                gid, self.glyph_count
            )));
        }
        if self.glyphs.contains_key(&gid) {
            return Ok(());
        }

        let (start, end) = if self.long_loca {
            (
                self.read_u32_at(loca as u64 + 4 * gid as u64)?,
                self.read_u32_at(loca as u64 + 4 * (gid as u64 + 1))?,
            )
        } else {
            (
                (self.read_u16_at(loca as u64 + 2 * gid as u64)? as u32) << 1,
                (self.read_u16_at(loca as u64 + 2 * (gid as u64 + 1))? as u32) << 1,
            )
        };
        let length = end.checked_sub(start).ok_or_else(|| {
            PdfError::UnsupportedFontFormat("non-monotonic loca table".to_string())
        })?;

        let offset = glyf + start;
        self.glyphs.insert(
            gid,
            GlyphRecord {
                offset,
                length,
                adv_offset: offset + 10,
                is_compound: false,
                components: Vec::new(),
            },
        );
        discovered.push(gid);

        if length == 0 {
            return Ok(());
        }
        let contour_count = self.read_i16_at(offset as u64)?;
        if contour_count >= 0 {
            return Ok(());
        }

        // Compound glyph: recurse into every component
        match self.glyphs.get_mut(&gid) {
            Some(record) => record.is_compound = true,
            None => {
                return Err(PdfError::InternalLogic(
                    "freshly inserted glyph vanished".to_string(),
                ))
            }
        }
        let adv_offset = offset + 10;
        let mut rel = 0u32;
        loop {
            let header = adv_offset + rel;
            if header + 4 > offset + length {
                return Err(PdfError::InternalLogic(
                    "compound component past glyph end".to_string(),
                ));
            }
            let flags = self.read_u16_at(header as u64)?;
            let component_gid = self.read_u16_at(header as u64 + 2)?;
            self.load_gid(glyf, loca, component_gid, discovered)?;
            match advance_compound_offset(rel, flags) {
                Some(next) => rel = next,
                None => break,
            }
        }
        Ok(())
    }

    fn write_tables(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();

        let num_tables = self.tables.len() as u16;
        let entry_selector = (15 - num_tables.leading_zeros()) as u16;
        let search_range = 16u16 << entry_selector;
        let range_shift = num_tables * 16 - search_range;

        out.extend_from_slice(&0x00010000u32.to_be_bytes());
        out.extend_from_slice(&num_tables.to_be_bytes());
        out.extend_from_slice(&search_range.to_be_bytes());
        out.extend_from_slice(&entry_selector.to_be_bytes());
        out.extend_from_slice(&range_shift.to_be_bytes());

        // Directory placeholders, rewritten once the table data is placed
        let directory_offset = out.len();
        for table in &self.tables {
            out.extend_from_slice(&table.tag);
            out.extend_from_slice(&[0u8; 12]);
        }

        let new_glyph_count = self.ordered_gids.len() as u16;
        let tables = self.tables.clone();
        let mut head_offset = None;
        for (i, table) in tables.iter().enumerate() {
            let table_offset = out.len();
            match table.tag {
                TAG_HEAD => {
                    head_offset = Some(table_offset);
                    self.copy_table(&mut out, table.offset, table.length)?;
                    // checkSumAdjustment starts at zero
                    write_u32_be(&mut out, table_offset + 4, 0)?;
                }
                TAG_MAXP => {
                    self.copy_table(&mut out, table.offset, table.length)?;
                    write_u16_be(&mut out, table_offset + 4, new_glyph_count)?;
                }
                TAG_HHEA => {
                    self.copy_table(&mut out, table.offset, table.length)?;
                    write_u16_be(&mut out, table_offset + 34, new_glyph_count)?;
                }
                TAG_POST => {
                    self.copy_table(&mut out, table.offset, table.length)?;
                    // Format 3, with the Type 1 suffix cleared
                    write_u32_be(&mut out, table_offset, 0x00030000)?;
                    for slot in &mut out[table_offset + 16..table_offset + 32] {
                        *slot = 0;
                    }
                }
                TAG_GLYF => self.write_glyf_table(&mut out)?,
                TAG_LOCA => self.write_loca_table(&mut out)?,
                TAG_HMTX => self.write_hmtx_table(&mut out)?,
                TAG_CVT | TAG_FPGM | TAG_PREP => {
                    self.copy_table(&mut out, table.offset, table.length)?;
                }
                _ => {
                    return Err(PdfError::InternalLogic(format!(
                        "unexpected table {} in subset",
                        String::from_utf8_lossy(&table.tag)
                    )))
                }
            }

            let table_length = out.len() - table_offset;
            while out.len() % 4 != 0 {
                out.push(0);
            }

            let entry = directory_offset + i * 16;
            let checksum = checksum(&out[table_offset..]);
            write_u32_be(&mut out, entry + 4, checksum)?;
            write_u32_be(&mut out, entry + 8, table_offset as u32)?;
            write_u32_be(&mut out, entry + 12, table_length as u32)?;
        }

        let head_offset = head_offset.ok_or_else(|| {
            PdfError::InternalLogic("'head' table missing from output".to_string())
        })?;
        let adjustment = 0xB1B0AFBAu32.wrapping_sub(checksum(&out));
        write_u32_be(&mut out, head_offset + 4, adjustment)?;

        Ok(out)
    }

    /// Copy the glyph data of every surviving glyph in output order,
    /// overwriting component-GID fields with the renumbered identifiers.
    fn write_glyf_table(&mut self, out: &mut Vec<u8>) -> Result<()> {
        for gid in self.ordered_gids.clone() {
            let (offset, length, is_compound, components) = {
                let record = self.glyph(gid)?;
                (
                    record.offset,
                    record.length,
                    record.is_compound,
                    record.components.clone(),
                )
            };
            if length == 0 {
                continue;
            }
            let mut data = vec![0u8; length as usize];
            self.device.seek(offset as u64)?;
            read_exact(self.device, &mut data)?;
            if is_compound {
                for (fixup, new_gid) in components {
                    let fixup = fixup as usize;
                    if fixup + 2 > data.len() {
                        return Err(PdfError::InternalLogic(
                            "component fixup past glyph end".to_string(),
                        ));
                    }
                    data[fixup..fixup + 2].copy_from_slice(&new_gid.to_be_bytes());
                }
            }
            out.extend_from_slice(&data);
        }
        Ok(())
    }

    /// Running offsets in output order, with the sentinel entry past the
    /// last glyph. The short form stores offsets halved.
    fn write_loca_table(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let mut address = 0u32;
        for gid in self.ordered_gids.clone() {
            self.write_loca_entry(out, address);
            address += self.glyph(gid)?.length;
        }
        self.write_loca_entry(out, address);
        Ok(())
    }

    fn write_loca_entry(&self, out: &mut Vec<u8>, address: u32) {
        if self.long_loca {
            out.extend_from_slice(&address.to_be_bytes());
        } else {
            out.extend_from_slice(&((address >> 1) as u16).to_be_bytes());
        }
    }

    /// One full advance/bearing pair per surviving glyph; the subset always
    /// uses the `numOfLongHorMetrics == numGlyphs` layout.
    fn write_hmtx_table(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let hmtx = self.table_offset(TAG_HMTX)? as u64;
        for gid in self.ordered_gids.clone() {
            let (advance, bearing) = if gid < self.metrics_count {
                (
                    self.read_u16_at(hmtx + 4 * gid as u64)?,
                    self.read_u16_at(hmtx + 4 * gid as u64 + 2)?,
                )
            } else {
                // Past the last full entry: the advance of the final pair
                // applies, bearings continue as a bare array
                let last_pair = hmtx + 4 * (self.metrics_count as u64 - 1);
                let bearing_offset = hmtx
                    + 4 * self.metrics_count as u64
                    + 2 * (gid - self.metrics_count) as u64;
                (
                    self.read_u16_at(last_pair)?,
                    self.read_u16_at(bearing_offset)?,
                )
            };
            out.extend_from_slice(&advance.to_be_bytes());
            out.extend_from_slice(&bearing.to_be_bytes());
        }
        Ok(())
    }

    fn glyph(&self, gid: u16) -> Result<&GlyphRecord> {
        self.glyphs.get(&gid).ok_or_else(|| {
            PdfError::InternalLogic(format!("glyph {} not loaded", gid))
        })
    }

    fn copy_table(&mut self, out: &mut Vec<u8>, offset: u32, length: u32) -> Result<()> {
        let mut data = vec![0u8; length as usize];
        self.device.seek(offset as u64)?;
        read_exact(self.device, &mut data)?;
        out.extend_from_slice(&data);
        Ok(())
    }

    fn read_u16_at(&mut self, offset: u64) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.device.seek(offset)?;
        read_exact(self.device, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_i16_at(&mut self, offset: u64) -> Result<i16> {
        Ok(self.read_u16_at(offset)? as i16)
    }

    fn read_u32_at(&mut self, offset: u64) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.device.seek(offset)?;
        read_exact(self.device, &mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }
}

/// Step to the next component header, or `None` when `MORE_COMPONENTS` is
/// clear.
fn advance_compound_offset(offset: u32, flags: u16) -> Option<u32> {
    if flags & MORE_COMPONENTS == 0 {
        return None;
    }
    let mut next = offset
        + if flags & ARG_1_AND_2_ARE_WORDS != 0 {
            8
        } else {
            6
        };
    if flags & WE_HAVE_A_SCALE != 0 {
        next += 2;
    } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
        next += 4;
    } else if flags & WE_HAVE_TWO_BY_TWO != 0 {
        next += 8;
    }
    Some(next)
}

/// The TrueType table checksum: big-endian 32-bit words summed with
/// wrap-around, reading zeros past the end of the data.
pub fn checksum(data: &[u8]) -> u32 {
    let mut sum = 0u32;
    let mut words = data.chunks_exact(4);
    for word in &mut words {
        sum = sum.wrapping_add(u32::from_be_bytes([word[0], word[1], word[2], word[3]]));
    }
    let tail = words.remainder();
    if !tail.is_empty() {
        let mut word = [0u8; 4];
        word[..tail.len()].copy_from_slice(tail);
        sum = sum.wrapping_add(u32::from_be_bytes(word));
    }
    sum
}

fn write_u16_be(out: &mut [u8], offset: usize, value: u16) -> Result<()> {
    if offset + 2 > out.len() {
        return Err(PdfError::InternalLogic(
            "fixup outside output buffer".to_string(),
        ));
    }
    out[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

fn write_u32_be(out: &mut [u8], offset: usize, value: u32) -> Result<()> {
    if offset + 4 > out.len() {
        return Err(PdfError::InternalLogic(
            "fixup outside output buffer".to_string(),
        ));
    }
    out[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    Ok(())
}
