use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

/// Sequencing technology that produced the reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SequencingTech {
    #[default]
    #[serde(rename = "Illumina")]
    Illumina,
    #[serde(rename = "PacBio CLR")]
    PacBioCLR,
    #[serde(rename = "PacBio CCS")]
    PacBioCCS,
    #[serde(rename = "IonTorrent")]
    IonTorrent,
    #[serde(rename = "NanoPore")]
    NanoPore,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl SequencingTech {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequencingTech::Illumina => "Illumina",
            SequencingTech::PacBioCLR => "PacBio CLR",
            SequencingTech::PacBioCCS => "PacBio CCS",
            SequencingTech::IonTorrent => "IonTorrent",
            SequencingTech::NanoPore => "NanoPore",
            SequencingTech::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SequencingTech {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SequencingTech {
    type Err = String;

    /// Case and whitespace insensitive, so `PacBio CLR`, `pacbioclr` and `PacBioCLR` all parse
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "illumina" => Ok(SequencingTech::Illumina),
            "pacbioclr" => Ok(SequencingTech::PacBioCLR),
            "pacbioccs" => Ok(SequencingTech::PacBioCCS),
            "iontorrent" => Ok(SequencingTech::IonTorrent),
            "nanopore" => Ok(SequencingTech::NanoPore),
            "unknown" => Ok(SequencingTech::Unknown),
            _ => Err(format!("unknown sequencing technology '{s}'")),
        }
    }
}

/// How the staged files are imported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ImportType {
    #[default]
    #[serde(rename = "FASTQ/FASTA")]
    FastqFasta,
    #[serde(rename = "SRA")]
    Sra,
}

impl FromStr for ImportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FASTQ/FASTA" | "FASTQ_FASTA" | "FASTQ" | "FASTA" => Ok(ImportType::FastqFasta),
            "SRA" => Ok(ImportType::Sra),
            _ => Err(format!("unknown import type '{s}'")),
        }
    }
}

/// One pair of staged sequencing files to be imported as a reads object
///
/// Built from a single row of the upload table and consumed once by the import submitter.
/// `forward_file` and `name` are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSpec {
    pub forward_file: PathBuf,
    pub reverse_file: Option<PathBuf>,
    pub name: String,
    pub workspace: String,
    pub sequencing_tech: SequencingTech,
    pub import_type: ImportType,
    pub insert_size_mean: Option<i64>,
    pub insert_size_std_dev: Option<i64>,
    pub interleaved: bool,
    pub read_orientation_outward: bool,
    pub single_genome: bool,
    pub sra_file: Option<PathBuf>,
}

impl UploadSpec {
    /// A record with every optional field at its default
    pub fn new(forward_file: PathBuf, reverse_file: Option<PathBuf>, name: String, workspace: String) -> UploadSpec {
        UploadSpec {
            forward_file,
            reverse_file,
            name,
            workspace,
            sequencing_tech: SequencingTech::default(),
            import_type: ImportType::default(),
            insert_size_mean: None,
            insert_size_std_dev: None,
            interleaved: false,
            read_orientation_outward: false,
            single_genome: true,
            sra_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_importer_defaults() {
        let upload = UploadSpec::new(PathBuf::from("a_1.fq"), None, "A".to_string(), "ws".to_string());
        assert_eq!(upload.sequencing_tech, SequencingTech::Illumina);
        assert_eq!(upload.import_type, ImportType::FastqFasta);
        assert!(!upload.interleaved);
        assert!(!upload.read_orientation_outward);
        assert!(upload.single_genome);
        assert_eq!(upload.sra_file, None);
    }

    #[test]
    fn sequencing_tech_parses_display_and_variant_names() {
        assert_eq!("PacBio CLR".parse::<SequencingTech>(), Ok(SequencingTech::PacBioCLR));
        assert_eq!("PacBioCCS".parse::<SequencingTech>(), Ok(SequencingTech::PacBioCCS));
        assert_eq!("nanopore".parse::<SequencingTech>(), Ok(SequencingTech::NanoPore));
        assert!("Sanger".parse::<SequencingTech>().is_err());
    }

    #[test]
    fn sequencing_tech_serialises_to_service_names() {
        let json = serde_json::to_string(&SequencingTech::PacBioCLR).unwrap();
        assert_eq!(json, "\"PacBio CLR\"");
        assert_eq!(SequencingTech::IonTorrent.to_string(), "IonTorrent");
    }

    #[test]
    fn import_type_accepts_both_spellings() {
        assert_eq!("FASTQ/FASTA".parse::<ImportType>(), Ok(ImportType::FastqFasta));
        assert_eq!("fastq_fasta".parse::<ImportType>(), Ok(ImportType::FastqFasta));
        assert_eq!("sra".parse::<ImportType>(), Ok(ImportType::Sra));
        assert_eq!(serde_json::to_string(&ImportType::FastqFasta).unwrap(), "\"FASTQ/FASTA\"");
    }
}
