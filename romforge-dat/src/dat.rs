use std::io::{BufRead, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::DatError;

/// A parsed DAT file (supports both Logiqx XML and ClrMamePro formats).
#[derive(Debug, Clone, Default)]
pub struct DatFile {
    pub name: String,
    pub description: String,
    pub version: String,
    pub games: Vec<DatGame>,
}

/// A single game entry from a DAT file.
#[derive(Debug, Clone, Default)]
pub struct DatGame {
    pub name: String,
    pub description: Option<String>,
    /// Free-text genre, if the DAT carries one (LibRetro metadat, enhanced XML).
    pub genre: Option<String>,
    /// Region string (e.g., "USA", "Japan"), if present.
    pub region: Option<String>,
    pub roms: Vec<DatRom>,
}

/// A single ROM entry within a game.
#[derive(Debug, Clone, Default)]
pub struct DatRom {
    pub name: String,
    pub size: u64,
    /// CRC32 checksum (lowercase hex)
    pub crc: String,
}

/// Parse a DAT file, auto-detecting format (XML or ClrMamePro).
pub fn parse_dat<R: BufRead>(mut reader: R) -> Result<DatFile, DatError> {
    // Peek at the first non-whitespace byte to detect the format
    let mut first_bytes = Vec::new();
    let mut buf = [0u8; 1];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Err(DatError::format("Empty DAT file"));
        }
        first_bytes.push(buf[0]);
        if !buf[0].is_ascii_whitespace() {
            break;
        }
    }

    let chain = std::io::Cursor::new(first_bytes).chain(reader);
    let buffered = std::io::BufReader::new(chain);

    if buf[0] == b'<' {
        parse_xml(buffered)
    } else {
        parse_clrmamepro(buffered)
    }
}

/// Parse a DAT from an in-memory byte buffer.
pub fn parse_dat_bytes(bytes: &[u8]) -> Result<DatFile, DatError> {
    parse_dat(bytes)
}

/// Parse a DAT file from a file path.
pub fn parse_dat_file(path: &std::path::Path) -> Result<DatFile, DatError> {
    let file = std::fs::File::open(path)?;
    parse_dat(std::io::BufReader::new(file))
}

// ---------------------------------------------------------------------------
// Logiqx XML parser
// ---------------------------------------------------------------------------

fn parse_xml<R: BufRead>(reader: R) -> Result<DatFile, DatError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut dat = DatFile::default();

    let mut saw_root = false;
    let mut in_header = false;
    let mut current_tag = String::new();
    let mut current_game: Option<DatGame> = None;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag_name = tag_name(e);
                check_root(&mut saw_root, &tag_name)?;
                match tag_name.as_str() {
                    "header" => in_header = true,
                    "game" | "machine" => current_game = Some(parse_xml_game_attributes(e)?),
                    "rom" => push_xml_rom(&mut current_game, e)?,
                    _ => current_tag = tag_name,
                }
            }
            Event::Empty(ref e) => {
                let tag_name = tag_name(e);
                check_root(&mut saw_root, &tag_name)?;
                match tag_name.as_str() {
                    "rom" => push_xml_rom(&mut current_game, e)?,
                    // A game with no roms contributes a title but nothing to match.
                    "game" | "machine" => dat.games.push(parse_xml_game_attributes(e)?),
                    _ => {}
                }
            }
            Event::Text(ref e) => {
                let text = e.unescape()?.to_string();
                if let Some(ref mut game) = current_game {
                    match current_tag.as_str() {
                        "description" => game.description = Some(text),
                        "genre" => game.genre = Some(text),
                        "region" => game.region = Some(text),
                        _ => {}
                    }
                } else if in_header {
                    match current_tag.as_str() {
                        "name" => dat.name = text,
                        "description" => dat.description = text,
                        "version" => dat.version = text,
                        _ => {}
                    }
                }
            }
            Event::End(ref e) => {
                let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match tag_name.as_str() {
                    "header" => in_header = false,
                    "game" | "machine" => {
                        if let Some(game) = current_game.take() {
                            dat.games.push(game);
                        }
                    }
                    _ => current_tag.clear(),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(DatError::format("Missing <datafile> root element"));
    }
    if dat.games.is_empty() {
        return Err(DatError::format("No games found in XML DAT file"));
    }

    Ok(dat)
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

/// The first element of the document must be `<datafile>`.
fn check_root(saw_root: &mut bool, tag_name: &str) -> Result<(), DatError> {
    if *saw_root {
        return Ok(());
    }
    if tag_name != "datafile" {
        return Err(DatError::format(format!(
            "Expected <datafile> root element, found <{tag_name}>"
        )));
    }
    *saw_root = true;
    Ok(())
}

fn parse_xml_game_attributes(e: &BytesStart<'_>) -> Result<DatGame, DatError> {
    let mut game = DatGame::default();
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.to_string();
        match attr.key.as_ref() {
            b"name" => game.name = value,
            b"genre" => game.genre = Some(value),
            b"region" => game.region = Some(value),
            _ => {}
        }
    }
    Ok(game)
}

fn push_xml_rom(current_game: &mut Option<DatGame>, e: &BytesStart<'_>) -> Result<(), DatError> {
    if let Some(game) = current_game {
        let rom = parse_xml_rom_attributes(e)?;
        game.roms.push(rom);
    }
    Ok(())
}

fn parse_xml_rom_attributes(e: &BytesStart<'_>) -> Result<DatRom, DatError> {
    let mut rom = DatRom::default();

    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.to_string();
        match attr.key.as_ref() {
            b"name" => rom.name = value,
            // Informational only; a bad value must not sink the catalog.
            b"size" => {
                rom.size = value.parse().unwrap_or_else(|_| {
                    log::debug!("Ignoring invalid ROM size {value:?}");
                    0
                });
            }
            b"crc" => rom.crc = value.to_lowercase(),
            _ => {}
        }
    }

    Ok(rom)
}

// ---------------------------------------------------------------------------
// ClrMamePro DAT parser
// ---------------------------------------------------------------------------

/// Parse a ClrMamePro format DAT file.
///
/// Format:
/// ```text
/// clrmamepro (
///     name "System Name"
///     version 20240101-000000
/// )
///
/// game (
///     name "Game Name (Region)"
///     genre "Action"
///     rom ( name "Game Name (Region).ext" size 12345 crc AABBCCDD )
/// )
/// ```
fn parse_clrmamepro<R: BufRead>(reader: R) -> Result<DatFile, DatError> {
    let mut dat = DatFile::default();

    let mut in_block: Option<String> = None; // "clrmamepro" or "game"
    let mut current_game: Option<DatGame> = None;

    for line_result in reader.lines() {
        let line = line_result?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let Some(block_type) = in_block.as_deref() else {
            if let Some(block_type) = detect_block_start(trimmed) {
                if block_type == "game" {
                    current_game = Some(DatGame::default());
                }
                in_block = Some(block_type);
            }
            continue;
        };

        if trimmed == ")" {
            if block_type == "game" {
                if let Some(game) = current_game.take() {
                    dat.games.push(game);
                }
            }
            in_block = None;
            continue;
        }

        let Some((key, value)) = parse_kv(trimmed) else {
            continue;
        };
        match block_type {
            "clrmamepro" => match key.as_str() {
                "name" => dat.name = value,
                "description" => dat.description = value,
                "version" => dat.version = value,
                _ => {}
            },
            "game" => {
                if let Some(ref mut game) = current_game {
                    match key.as_str() {
                        "name" => game.name = value,
                        "description" => game.description = Some(value),
                        "genre" => game.genre = Some(value),
                        "region" => game.region = Some(value),
                        "rom" => {
                            if let Some(rom) = parse_clr_rom_inline(&value) {
                                game.roms.push(rom);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    if dat.games.is_empty() {
        return Err(DatError::format("No games found in ClrMamePro DAT file"));
    }

    Ok(dat)
}

/// Detect a block start like `clrmamepro (` or `game (`.
fn detect_block_start(line: &str) -> Option<String> {
    let block_type = line.trim_end().strip_suffix('(')?.trim();
    if !block_type.is_empty() && block_type.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Some(block_type.to_lowercase());
    }
    None
}

/// Parse a key-value line like `name "Some Value"` or `version 20240101`.
/// For `rom ( ... )` lines, the value is the content inside outer parens.
fn parse_kv(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();

    if let Some(rest) = trimmed.strip_prefix("rom") {
        let rest = rest.trim();
        if let Some(inner) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            return Some(("rom".to_string(), inner.trim().to_string()));
        }
    }

    let mut parts = trimmed.splitn(2, |c: char| c.is_ascii_whitespace());
    let key = parts.next()?.trim().to_string();
    let raw_value = parts.next()?.trim();

    let value = raw_value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(raw_value)
        .to_string();

    Some((key, value))
}

/// Parse an inline ROM entry like:
/// `name "Game (Region).ext" size 12345 crc AABBCCDD md5 ... sha1 ...`
fn parse_clr_rom_inline(inner: &str) -> Option<DatRom> {
    let tokens = tokenize_rom_line(inner);
    let mut rom = DatRom::default();

    let mut pairs = tokens.iter();
    while let Some(key) = pairs.next() {
        let Some(value) = pairs.next() else {
            break;
        };
        match key.as_str() {
            "name" => rom.name = value.clone(),
            "size" => rom.size = value.parse().unwrap_or(0),
            "crc" => rom.crc = value.to_lowercase(),
            _ => {}
        }
    }

    if rom.name.is_empty() {
        return None;
    }
    Some(rom)
}

/// Tokenize a ROM line, respecting quoted strings.
/// `name "Game (Region).ext" size 12345 crc AB` → ["name", "Game (Region).ext", "size", "12345", "crc", "AB"]
fn tokenize_rom_line(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            chars.next();
        }

        let Some(&first) = chars.peek() else {
            break;
        };

        let mut token = String::new();
        if first == '"' {
            chars.next();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                token.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_ascii_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- XML tests --

    const SAMPLE_XML_DAT: &str = r#"<?xml version="1.0"?>
<!DOCTYPE datafile SYSTEM "http://www.logiqx.com/Dats/datafile.dtd">
<datafile>
    <header>
        <name>Nintendo - Super Nintendo Entertainment System</name>
        <description>Nintendo - Super Nintendo Entertainment System (20240101-000000)</description>
        <version>20240101-000000</version>
    </header>
    <game name="Super Mario World (USA)">
        <description>Super Mario World (USA)</description>
        <genre>Platform</genre>
        <region>USA</region>
        <rom name="Super Mario World (USA).sfc" size="524288" crc="B19ED489"/>
    </game>
    <game name="Street Fighter II Turbo (USA)">
        <rom name="Street Fighter II Turbo (USA) (Part 1).sfc" size="1048576" crc="3b7b2f4e"/>
        <rom name="Street Fighter II Turbo (USA) (Part 2).sfc" size="1048576" crc="9c0f2e11"/>
    </game>
</datafile>"#;

    #[test]
    fn test_parse_xml_dat() {
        let dat = parse_dat(SAMPLE_XML_DAT.as_bytes()).unwrap();
        assert_eq!(dat.name, "Nintendo - Super Nintendo Entertainment System");
        assert_eq!(dat.version, "20240101-000000");
        assert_eq!(dat.games.len(), 2);

        let smw = &dat.games[0];
        assert_eq!(smw.name, "Super Mario World (USA)");
        assert_eq!(smw.genre.as_deref(), Some("Platform"));
        assert_eq!(smw.region.as_deref(), Some("USA"));
        assert_eq!(smw.roms.len(), 1);
        assert_eq!(smw.roms[0].name, "Super Mario World (USA).sfc");
        assert_eq!(smw.roms[0].size, 524288);
        assert_eq!(smw.roms[0].crc, "b19ed489");
    }

    #[test]
    fn test_parse_xml_multi_rom_game() {
        let dat = parse_dat(SAMPLE_XML_DAT.as_bytes()).unwrap();
        let sf2 = &dat.games[1];
        assert_eq!(sf2.roms.len(), 2);
        assert_eq!(sf2.genre, None);
        assert_eq!(sf2.roms[1].crc, "9c0f2e11");
    }

    #[test]
    fn test_parse_xml_game_attributes_and_entities() {
        let xml = r#"<?xml version="1.0"?>
<datafile>
    <game name="Tom &amp; Jerry (USA)" genre="Action" region="USA">
        <rom name="Tom &amp; Jerry (USA).sfc" size="1024" crc="DEADBEEF"></rom>
    </game>
</datafile>"#;
        let dat = parse_dat(xml.as_bytes()).unwrap();
        let game = &dat.games[0];
        assert_eq!(game.name, "Tom & Jerry (USA)");
        assert_eq!(game.genre.as_deref(), Some("Action"));
        assert_eq!(game.roms[0].name, "Tom & Jerry (USA).sfc");
        assert_eq!(game.roms[0].crc, "deadbeef");
    }

    #[test]
    fn test_parse_xml_invalid_size_is_lenient() {
        let xml = r#"<?xml version="1.0"?>
<datafile>
    <game name="Alpha (USA)">
        <rom name="Alpha (USA).sfc" size="1 MiB" crc="0000abcd"/>
    </game>
    <game name="Beta (USA)">
        <rom name="Beta (USA).sfc" size="2048" crc="0000beef"/>
    </game>
</datafile>"#;
        let dat = parse_dat(xml.as_bytes()).unwrap();
        assert_eq!(dat.games.len(), 2);
        assert_eq!(dat.games[0].roms[0].size, 0);
        assert_eq!(dat.games[0].roms[0].crc, "0000abcd");
        assert_eq!(dat.games[1].roms[0].size, 2048);
    }

    #[test]
    fn test_parse_empty_xml() {
        let xml = r#"<?xml version="1.0"?><datafile></datafile>"#;
        let result = parse_dat(xml.as_bytes());
        assert!(matches!(result, Err(DatError::Format(_))));
    }

    #[test]
    fn test_parse_xml_wrong_root() {
        let xml = r#"<?xml version="1.0"?>
<softwarelist><game name="X"><rom name="x.sfc" size="1" crc="00000000"/></game></softwarelist>"#;
        let result = parse_dat(xml.as_bytes());
        assert!(matches!(result, Err(DatError::Format(_))));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(matches!(parse_dat("   \n".as_bytes()), Err(DatError::Format(_))));
    }

    // -- ClrMamePro tests --

    const SAMPLE_CLR_DAT: &str = r#"clrmamepro (
	name "Nintendo - Super Nintendo Entertainment System"
	description "Nintendo - Super Nintendo Entertainment System"
	version 20141025-064058
)

game (
	name "ActRaiser (USA)"
	description "ActRaiser (USA)"
	region "USA"
	genre "Action"
	rom ( name "ActRaiser (USA).sfc" size 1048576 crc 9EA13CB8 md5 4187A797E33BC96A96993220DA6F09F7 sha1 56FE858D1035DCE4B68520F457A0858BAE7BB16D )
)

game (
	name "10-Yard Fight (USA, Europe)"
	description "10-Yard Fight (USA, Europe)"
	rom ( name "10-Yard Fight (USA, Europe).sfc" size 40960 crc 3D564757 )
)
"#;

    #[test]
    fn test_parse_clrmamepro_dat() {
        let dat = parse_dat(SAMPLE_CLR_DAT.as_bytes()).unwrap();
        assert_eq!(dat.name, "Nintendo - Super Nintendo Entertainment System");
        assert_eq!(dat.version, "20141025-064058");
        assert_eq!(dat.games.len(), 2);

        let game0 = &dat.games[0];
        assert_eq!(game0.name, "ActRaiser (USA)");
        assert_eq!(game0.region.as_deref(), Some("USA"));
        assert_eq!(game0.genre.as_deref(), Some("Action"));
        assert_eq!(game0.roms.len(), 1);
        assert_eq!(game0.roms[0].name, "ActRaiser (USA).sfc");
        assert_eq!(game0.roms[0].size, 1048576);
        assert_eq!(game0.roms[0].crc, "9ea13cb8");

        let game1 = &dat.games[1];
        assert_eq!(game1.region, None);
        assert_eq!(game1.genre, None);
        assert_eq!(game1.roms[0].size, 40960);
    }

    #[test]
    fn test_parse_empty_clrmamepro() {
        let result = parse_dat("clrmamepro (\n)\n".as_bytes());
        assert!(matches!(result, Err(DatError::Format(_))));
    }

    #[test]
    fn test_tokenize_quoted_rom() {
        let tokens = tokenize_rom_line(r#"name "Game (USA, Europe).sfc" size 524288 crc ABCD1234"#);
        assert_eq!(
            tokens,
            vec![
                "name",
                "Game (USA, Europe).sfc",
                "size",
                "524288",
                "crc",
                "ABCD1234",
            ]
        );
    }
}
