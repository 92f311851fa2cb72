//! Upload categories
//!
//! Each category is a fixed storage partition with its own multipart field
//! name and accepted filename extensions.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Rfp,
    CompanyData,
}

impl Category {
    /// Lookup order used when resolving an identifier across partitions
    pub const ALL: [Self; 2] = [Self::Rfp, Self::CompanyData];

    /// Directory name under the upload root, also the `type` reported by lookups
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rfp => "rfp",
            Self::CompanyData => "company_data",
        }
    }

    /// Multipart form field carrying a file of this category
    pub const fn form_field(self) -> &'static str {
        match self {
            Self::Rfp => "rfp_file",
            Self::CompanyData => "company_data",
        }
    }

    pub fn from_form_field(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.form_field() == name)
    }

    pub const fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Rfp => &[".pdf", ".doc", ".docx"],
            Self::CompanyData => &[".json", ".csv"],
        }
    }

    pub const fn invalid_type_message(self) -> &'static str {
        match self {
            Self::Rfp => "RFP file must be PDF, DOC, or DOCX",
            Self::CompanyData => "Company data file must be JSON or CSV",
        }
    }

    /// Return the filename's extension, case preserved, if it is accepted here.
    ///
    /// Matching is ASCII case-insensitive on the end of the name, so
    /// `Proposal.PDF` yields `.PDF`.
    pub fn accepted_extension(self, filename: &str) -> Option<String> {
        self.allowed_extensions().iter().find_map(|ext| {
            let start = filename.len().checked_sub(ext.len())?;
            let suffix = filename.get(start..)?;
            suffix.eq_ignore_ascii_case(ext).then(|| suffix.to_string())
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfp_extensions() {
        assert_eq!(Category::Rfp.accepted_extension("proposal.pdf").as_deref(), Some(".pdf"));
        assert_eq!(Category::Rfp.accepted_extension("Bid.DOCX").as_deref(), Some(".DOCX"));
        assert_eq!(Category::Rfp.accepted_extension("old.doc").as_deref(), Some(".doc"));
        assert!(Category::Rfp.accepted_extension("data.txt").is_none());
        assert!(Category::Rfp.accepted_extension("company.csv").is_none());
        assert!(Category::Rfp.accepted_extension("pdf").is_none());
    }

    #[test]
    fn test_company_data_extensions() {
        assert_eq!(
            Category::CompanyData.accepted_extension("company.csv").as_deref(),
            Some(".csv")
        );
        assert_eq!(
            Category::CompanyData.accepted_extension("profile.Json").as_deref(),
            Some(".Json")
        );
        assert!(Category::CompanyData.accepted_extension("proposal.pdf").is_none());
    }

    #[test]
    fn test_multibyte_filename() {
        assert_eq!(Category::Rfp.accepted_extension("提案.pdf").as_deref(), Some(".pdf"));
        assert!(Category::Rfp.accepted_extension("提案").is_none());
    }

    #[test]
    fn test_form_fields() {
        assert_eq!(Category::from_form_field("rfp_file"), Some(Category::Rfp));
        assert_eq!(Category::from_form_field("company_data"), Some(Category::CompanyData));
        assert_eq!(Category::from_form_field("rfp"), None);
    }

    #[test]
    fn test_serialize_as_type_name() {
        assert_eq!(serde_json::to_string(&Category::CompanyData).unwrap(), "\"company_data\"");
        assert_eq!(Category::Rfp.to_string(), "rfp");
    }
}
