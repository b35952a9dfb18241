//! Fixed column layout of the exported sheet.
//!
//! The dashboard looks columns up by header text, so these names must not
//! change between releases.

/// Worksheet the records live on.
pub const SHEET_NAME: &str = "Videos";

/// One column of the exported sheet, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Uploader,
    UploadDate,
    Description,
    Hashtags,
    Likes,
    Comments,
    Favorites,
    Shares,
    Music,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::Id,
        Column::Uploader,
        Column::UploadDate,
        Column::Description,
        Column::Hashtags,
        Column::Likes,
        Column::Comments,
        Column::Favorites,
        Column::Shares,
        Column::Music,
    ];

    /// Header text written in row 0.
    pub fn header(self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::Uploader => "Uploader",
            Column::UploadDate => "Upload Date",
            Column::Description => "Description",
            Column::Hashtags => "Hashtags",
            Column::Likes => "Likes",
            Column::Comments => "Comments",
            Column::Favorites => "Favorites",
            Column::Shares => "Shares",
            Column::Music => "Music Text",
        }
    }

    /// Zero-based position in the sheet.
    pub fn index(self) -> u16 {
        Column::ALL.iter().position(|c| *c == self).unwrap_or(0) as u16
    }

    /// Count columns are written as numbers.
    pub fn is_count(self) -> bool {
        matches!(
            self,
            Column::Likes | Column::Comments | Column::Favorites | Column::Shares
        )
    }

    /// Display width in characters.
    pub(crate) fn width(self) -> f64 {
        match self {
            Column::Id => 22.0,
            Column::Description => 60.0,
            Column::Hashtags | Column::Music => 30.0,
            Column::Uploader => 20.0,
            Column::UploadDate => 12.0,
            _ => 11.0,
        }
    }

    /// Columns the reader refuses to load without.
    pub(crate) fn required(self) -> bool {
        matches!(
            self,
            Column::Uploader | Column::Likes | Column::Comments | Column::Shares
        )
    }

    pub fn from_header(header: &str) -> Option<Column> {
        let header = header.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.header().eq_ignore_ascii_case(header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_unique() {
        let mut headers: Vec<_> = Column::ALL.iter().map(|c| c.header()).collect();
        headers.sort();
        headers.dedup();
        assert_eq!(headers.len(), Column::ALL.len());
    }

    #[test]
    fn test_index_matches_order() {
        for (i, col) in Column::ALL.iter().enumerate() {
            assert_eq!(col.index() as usize, i);
        }
    }

    #[test]
    fn test_from_header_ignores_case_and_whitespace() {
        assert_eq!(Column::from_header(" likes "), Some(Column::Likes));
        assert_eq!(Column::from_header("Music Text"), Some(Column::Music));
        assert_eq!(Column::from_header("Views"), None);
    }
}
