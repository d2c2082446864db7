//! Raster staging for coverage store uploads.
//!
//! Uploads are prepared entirely in memory: archives pass through untouched,
//! loose raster files upload raw, and GRASS ASCII grids are rewritten into
//! the Arc/Info header format the server's ArcGrid reader expects before
//! being repacked into a fresh archive.

use std::fmt;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

use crate::geoserver::error::GeoServerError;

const GRASS_ERROR: &str = "GRASS file could not be processed, check to ensure \
                           the GRASS grid is correctly formatted or included.";

/// Raster formats accepted by coverage stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageType {
    Aig,
    ArcGrid,
    Dted,
    Ecw,
    EHdr,
    EnviHdr,
    ErdasImg,
    GeoTiff,
    GrassGrid,
    Gtopo30,
    ImageMosaic,
    ImagePyramid,
    Jp2MrSid,
    MrSid,
    NetCdf,
    Nitf,
    Rpftoc,
    Rst,
    WorldImage,
}

impl CoverageType {
    pub const ALL: [CoverageType; 19] = [
        CoverageType::Aig,
        CoverageType::ArcGrid,
        CoverageType::Dted,
        CoverageType::Ecw,
        CoverageType::EHdr,
        CoverageType::EnviHdr,
        CoverageType::ErdasImg,
        CoverageType::GeoTiff,
        CoverageType::GrassGrid,
        CoverageType::Gtopo30,
        CoverageType::ImageMosaic,
        CoverageType::ImagePyramid,
        CoverageType::Jp2MrSid,
        CoverageType::MrSid,
        CoverageType::NetCdf,
        CoverageType::Nitf,
        CoverageType::Rpftoc,
        CoverageType::Rst,
        CoverageType::WorldImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageType::Aig => "AIG",
            CoverageType::ArcGrid => "ArcGrid",
            CoverageType::Dted => "DTED",
            CoverageType::Ecw => "ECW",
            CoverageType::EHdr => "EHdr",
            CoverageType::EnviHdr => "ENVIHdr",
            CoverageType::ErdasImg => "ERDASImg",
            CoverageType::GeoTiff => "GeoTIFF",
            CoverageType::GrassGrid => "GrassGrid",
            CoverageType::Gtopo30 => "Gtopo30",
            CoverageType::ImageMosaic => "ImageMosaic",
            CoverageType::ImagePyramid => "ImagePyramid",
            CoverageType::Jp2MrSid => "JP2MrSID",
            CoverageType::MrSid => "MrSID",
            CoverageType::NetCdf => "NetCDF",
            CoverageType::Nitf => "NITF",
            CoverageType::Rpftoc => "RPFTOC",
            CoverageType::Rst => "RST",
            CoverageType::WorldImage => "WorldImage",
        }
    }

    /// Upload extension used in the `file.{extension}` REST path. GRASS
    /// grids upload as ArcGrid after rewriting.
    pub fn extension(&self) -> &'static str {
        match self {
            CoverageType::Aig => "aig",
            CoverageType::ArcGrid | CoverageType::GrassGrid => "arcgrid",
            CoverageType::Dted => "dted",
            CoverageType::Ecw => "ecw",
            CoverageType::EHdr => "ehdr",
            CoverageType::EnviHdr => "envihdr",
            CoverageType::ErdasImg => "erdasimg",
            CoverageType::GeoTiff => "geotiff",
            CoverageType::Gtopo30 => "gtopo30",
            CoverageType::ImageMosaic => "imagemosaic",
            CoverageType::ImagePyramid => "imagepyramid",
            CoverageType::Jp2MrSid => "jp2mrsid",
            CoverageType::MrSid => "mrsid",
            CoverageType::NetCdf => "netcdf",
            CoverageType::Nitf => "nitf",
            CoverageType::Rpftoc => "rpftoc",
            CoverageType::Rst => "rst",
            CoverageType::WorldImage => "worldimage",
        }
    }

    /// Store type advertised when creating the backing coverage store.
    pub fn store_format(&self) -> &'static str {
        match self {
            CoverageType::GrassGrid => "ArcGrid",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for CoverageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoverageType {
    type Err = GeoServerError;

    fn from_str(value: &str) -> Result<CoverageType, GeoServerError> {
        CoverageType::ALL
            .iter()
            .find(|candidate| candidate.as_str() == value)
            .copied()
            .ok_or_else(|| {
                let valid = CoverageType::ALL.map(|candidate| candidate.as_str()).join(", ");
                GeoServerError::InvalidArgument(format!(
                    "\"{value}\" is not a valid coverage_type. Use either {valid}"
                ))
            })
    }
}

/// Where the raster bytes come from.
#[derive(Debug, Clone)]
pub enum CoverageSource {
    /// Read from the local filesystem.
    Path(PathBuf),
    /// Bytes handed over directly, e.g. from an HTTP upload.
    Upload { file_name: String, data: Vec<u8> },
}

impl CoverageSource {
    pub fn path(path: impl Into<PathBuf>) -> CoverageSource {
        CoverageSource::Path(path.into())
    }

    pub fn upload(file_name: impl Into<String>, data: Vec<u8>) -> CoverageSource {
        CoverageSource::Upload {
            file_name: file_name.into(),
            data,
        }
    }
}

/// A request body ready for the coverage store file endpoint.
#[derive(Debug, Clone)]
pub struct CoveragePayload {
    pub content_type: String,
    pub data: Vec<u8>,
}

pub(crate) struct ArchiveMember {
    pub(crate) name: String,
    pub(crate) is_dir: bool,
    pub(crate) data: Vec<u8>,
}

impl ArchiveMember {
    pub(crate) fn file(name: impl Into<String>, data: Vec<u8>) -> ArchiveMember {
        ArchiveMember {
            name: name.into(),
            is_dir: false,
            data,
        }
    }
}

/// Prepare raster bytes for upload.
///
/// Archives other than GRASS grids pass through unchanged. A loose file
/// uploads raw with an `image/{extension}` content type. GRASS grids are
/// unpacked, rewritten and repacked.
pub fn stage_coverage(
    coverage_type: CoverageType,
    source: CoverageSource,
) -> Result<CoveragePayload, GeoServerError> {
    let (file_name, data) = match source {
        CoverageSource::Path(path) => {
            let data = std::fs::read(&path)
                .map_err(|source| GeoServerError::file(path.display(), source))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            (file_name, data)
        }
        CoverageSource::Upload { file_name, data } => (file_name, data),
    };
    let is_archive = data.starts_with(b"PK");

    if coverage_type == CoverageType::GrassGrid {
        let members = if is_archive {
            unpack(&data)?
        } else {
            vec![ArchiveMember {
                name: file_name,
                is_dir: false,
                data,
            }]
        };
        return stage_grass_grid(members);
    }

    if is_archive {
        return Ok(CoveragePayload {
            content_type: "application/zip".to_string(),
            data,
        });
    }

    let extension = Path::new(&file_name)
        .extension()
        .map(|extension| extension.to_string_lossy().into_owned())
        .unwrap_or_else(|| coverage_type.extension().to_string());
    Ok(CoveragePayload {
        content_type: format!("image/{extension}"),
        data,
    })
}

fn unpack(data: &[u8]) -> Result<Vec<ArchiveMember>, GeoServerError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut members = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data).map_err(ZipError::Io)?;
        members.push(ArchiveMember {
            name: entry.name().to_string(),
            is_dir: entry.is_dir(),
            data,
        });
    }
    Ok(members)
}

pub(crate) fn pack(members: &[ArchiveMember]) -> Result<Vec<u8>, GeoServerError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for member in members {
        if member.is_dir {
            continue;
        }
        writer.start_file(member.name.as_str(), options)?;
        writer.write_all(&member.data).map_err(ZipError::Io)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Rewrite GRASS members into Arc/Info ASCII grids and repack.
///
/// Projection sidecars and directories are carried through untouched. A
/// member that does not parse is kept as-is with a warning; the upload only
/// fails when no member could be rewritten at all.
fn stage_grass_grid(mut members: Vec<ArchiveMember>) -> Result<CoveragePayload, GeoServerError> {
    if members.len() > 2 {
        let names: Vec<&str> = members.iter().map(|member| member.name.as_str()).collect();
        return Err(GeoServerError::InvalidArgument(format!(
            "Expected 1 or 2 files for coverage type \"{}\" but got {} instead: \"{}\"",
            CoverageType::GrassGrid,
            members.len(),
            names.join("\", \""),
        )));
    }

    let mut rewrote = false;
    for member in &mut members {
        if member.is_dir || member.name.contains("prj") {
            continue;
        }
        let rewritten = std::str::from_utf8(&member.data)
            .ok()
            .and_then(rewrite_grass_grid);
        match rewritten {
            Some(content) => {
                debug!(member = %member.name, "rewrote GRASS grid header");
                member.data = content.into_bytes();
                rewrote = true;
            }
            None => {
                warn!(member = %member.name, "GRASS member could not be parsed, leaving untouched");
            }
        }
    }
    if !rewrote {
        return Err(GeoServerError::Grid(GRASS_ERROR.to_string()));
    }

    Ok(CoveragePayload {
        content_type: "application/zip".to_string(),
        data: pack(&members)?,
    })
}

/// Swap the six-line GRASS header for the five-line Arc/Info one.
///
/// The lower-left corner is the west/south edge and the cell size comes from
/// the north-south extent divided by the row count.
fn rewrite_grass_grid(content: &str) -> Option<String> {
    let mut north = None;
    let mut south = None;
    let mut west = None;
    let mut rows: Option<u64> = None;
    let mut cols: Option<u64> = None;

    for line in content.lines().take(6) {
        let value = line.split_once(':').map(|(_, value)| value.trim());
        if line.contains("north") {
            north = Some(value?.parse::<f64>().ok()?);
        } else if line.contains("south") {
            south = Some(value?.parse::<f64>().ok()?);
        } else if line.contains("east") {
            // Not needed for the rewritten header.
        } else if line.contains("west") {
            west = Some(value?.parse::<f64>().ok()?);
        } else if line.contains("rows") {
            rows = Some(value?.parse().ok()?);
        } else if line.contains("cols") {
            cols = Some(value?.parse().ok()?);
        }
    }

    let (north, south, west) = (north?, south?, west?);
    let (rows, cols) = (rows?, cols?);
    if rows == 0 {
        return None;
    }
    let cellsize = (north - south) / rows as f64;

    let mut rebuilt = format!(
        "ncols         {cols}\n\
         nrows         {rows}\n\
         xllcorner     {west}\n\
         yllcorner     {south}\n\
         cellsize      {cellsize}\n"
    );
    for line in content.split_inclusive('\n').skip(6) {
        rebuilt.push_str(line);
    }
    if !rebuilt.ends_with('\n') {
        rebuilt.push('\n');
    }
    Some(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GRASS_GRID: &str = "north: 4928010\n\
                              south: 4914000\n\
                              east: 609000\n\
                              west: 590010\n\
                              rows: 467\n\
                              cols: 633\n\
                              1 2 3\n\
                              4 5 6\n";

    fn zip_of(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in members {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn member_of(data: &[u8], name: &str) -> Vec<u8> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        content
    }

    #[test]
    fn test_coverage_type_round_trip() {
        for coverage_type in CoverageType::ALL {
            assert_eq!(coverage_type.as_str().parse::<CoverageType>().unwrap(), coverage_type);
        }
    }

    #[test]
    fn test_invalid_coverage_type_lists_valid_ones() {
        let error = "TIFF".parse::<CoverageType>().unwrap_err();
        let message = error.to_string();
        assert!(message.starts_with("\"TIFF\" is not a valid coverage_type. Use either AIG, ArcGrid"));
        assert!(message.ends_with("WorldImage"));
    }

    #[test]
    fn test_grass_grid_uploads_as_arcgrid() {
        assert_eq!(CoverageType::GrassGrid.extension(), "arcgrid");
        assert_eq!(CoverageType::GrassGrid.store_format(), "ArcGrid");
        assert_eq!(CoverageType::GeoTiff.extension(), "geotiff");
        assert_eq!(CoverageType::GeoTiff.store_format(), "GeoTIFF");
    }

    #[test]
    fn test_rewrite_grass_grid_header() {
        let rewritten = rewrite_grass_grid(GRASS_GRID).unwrap();
        assert_eq!(
            rewritten,
            "ncols         633\n\
             nrows         467\n\
             xllcorner     590010\n\
             yllcorner     4914000\n\
             cellsize      30\n\
             1 2 3\n\
             4 5 6\n"
        );
    }

    #[test]
    fn test_rewrite_requires_all_header_keys() {
        assert!(rewrite_grass_grid("north: 10\nsouth: 0\n1 2 3\n").is_none());
        assert!(rewrite_grass_grid("not a grass grid at all").is_none());
        // A zero row count would make the cell size undefined.
        assert!(rewrite_grass_grid(
            "north: 10\nsouth: 0\neast: 5\nwest: 0\nrows: 0\ncols: 3\n"
        )
        .is_none());
    }

    #[test]
    fn test_archive_passes_through_unchanged() {
        let archive = zip_of(&[("dem.tif", b"not really a tiff")]);
        let payload =
            stage_coverage(CoverageType::GeoTiff, CoverageSource::upload("dem.zip", archive.clone()))
                .unwrap();
        assert_eq!(payload.content_type, "application/zip");
        assert_eq!(payload.data, archive);
    }

    #[test]
    fn test_loose_file_uploads_raw() {
        let payload = stage_coverage(
            CoverageType::GeoTiff,
            CoverageSource::upload("dem.tif", b"raster bytes".to_vec()),
        )
        .unwrap();
        assert_eq!(payload.content_type, "image/tif");
        assert_eq!(payload.data, b"raster bytes");
    }

    #[test]
    fn test_grass_archive_is_rewritten() {
        let archive = zip_of(&[
            ("grid.asc", GRASS_GRID.as_bytes()),
            ("grid.prj", b"PROJCS[...]"),
        ]);
        let payload =
            stage_coverage(CoverageType::GrassGrid, CoverageSource::upload("grid.zip", archive))
                .unwrap();
        assert_eq!(payload.content_type, "application/zip");

        let grid = member_of(&payload.data, "grid.asc");
        assert!(std::str::from_utf8(&grid).unwrap().starts_with("ncols         633\n"));
        assert_eq!(member_of(&payload.data, "grid.prj"), b"PROJCS[...]");
    }

    #[test]
    fn test_grass_archive_with_too_many_members() {
        let archive = zip_of(&[("a", b"1"), ("b", b"2"), ("c", b"3")]);
        let error =
            stage_coverage(CoverageType::GrassGrid, CoverageSource::upload("grid.zip", archive))
                .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Expected 1 or 2 files for coverage type \"GrassGrid\" but got 3 instead: \"a\", \"b\", \"c\""
        );
    }

    #[test]
    fn test_grass_archive_with_no_usable_member() {
        let archive = zip_of(&[("grid.asc", b"garbage"), ("grid.prj", b"PROJCS[...]")]);
        let error =
            stage_coverage(CoverageType::GrassGrid, CoverageSource::upload("grid.zip", archive))
                .unwrap_err();
        assert!(error.to_string().contains("GRASS file could not be processed"));
    }

    #[test]
    fn test_loose_grass_file_is_rewritten_and_packed() {
        let payload = stage_coverage(
            CoverageType::GrassGrid,
            CoverageSource::upload("grid.asc", GRASS_GRID.as_bytes().to_vec()),
        )
        .unwrap();
        assert_eq!(payload.content_type, "application/zip");
        let grid = member_of(&payload.data, "grid.asc");
        assert!(std::str::from_utf8(&grid).unwrap().contains("cellsize      30\n"));
    }

    proptest! {
        #[test]
        fn test_cellsize_matches_extent(
            south in -1_000_000.0_f64..1_000_000.0,
            span in 1.0_f64..100_000.0,
            rows in 1_u64..10_000,
        ) {
            let north = south + span;
            let grid = format!(
                "north: {north}\nsouth: {south}\neast: 10\nwest: 0\nrows: {rows}\ncols: 4\n0 0 0 0\n"
            );
            let rewritten = rewrite_grass_grid(&grid).unwrap();
            let cellsize_line = rewritten
                .lines()
                .find(|line| line.starts_with("cellsize"))
                .unwrap();
            let cellsize: f64 = cellsize_line.split_whitespace().nth(1).unwrap().parse().unwrap();
            prop_assert!((cellsize * rows as f64 - span).abs() < 1e-6 * span.max(1.0));
        }
    }
}
