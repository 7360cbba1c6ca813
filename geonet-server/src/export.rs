//! Downloadable archive of an analysed collection

use std::io::{Cursor, Write};

use geojson::FeatureCollection;

/// Name the client saves the archive under
pub const ARCHIVE_FILE_NAME: &str = "geonet_output.zip";
/// The single entry of the archive
pub const GEOJSON_ENTRY_NAME: &str = "network_analysis.geojson";

/// Packs `collection` as pretty-printed `GeoJSON` into a deflated zip archive
pub fn zip_collection(collection: &FeatureCollection) -> std::io::Result<Vec<u8>> {
    let geojson = serde_json::to_vec_pretty(collection)?;

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        zip.start_file(GEOJSON_ENTRY_NAME, options)?;
        zip.write_all(&geojson)?;
        zip.finish()?;
    }

    Ok(buffer.into_inner())
}
