use serde::{Deserialize, Serialize};

use crate::error::{Result, SwaraError};
use crate::instrument::Instrument;
use crate::phrase::Phrase;
use crate::uid::UniqueId;

/// Serializable form of a strand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandDescriptor {
    pub label: String,
    #[serde(rename = "phraseIDs")]
    pub phrase_ids: Vec<String>,
    pub id: String,
}

/// Serializable form of an [`Assemblage`]; stored on the piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblageDescriptor {
    pub instrument: Instrument,
    pub strands: Vec<StrandDescriptor>,
    pub name: String,
    pub id: String,
    #[serde(rename = "loosePhraseIDs", default)]
    pub loose_phrase_ids: Vec<String>,
}

/// A labelled, ordered subset of an assemblage's phrases.
#[derive(Debug, Clone, PartialEq)]
pub struct Strand {
    pub label: String,
    pub id: String,
    phrase_ids: Vec<String>,
}

impl Strand {
    fn new(label: &str, id: Option<String>) -> Self {
        Strand {
            label: label.to_string(),
            id: id.unwrap_or_else(|| UniqueId::new_v4().to_string()),
            phrase_ids: Vec::new(),
        }
    }

    pub fn phrase_ids(&self) -> &[String] {
        &self.phrase_ids
    }

    pub fn contains(&self, phrase_id: &str) -> bool {
        self.phrase_ids.iter().any(|id| id == phrase_id)
    }

    fn add(&mut self, phrase_id: &str) -> Result<()> {
        if self.contains(phrase_id) {
            return Err(SwaraError::duplicate(
                "phrase in strand",
                format!("{} ({})", phrase_id, self.label),
            ));
        }
        self.phrase_ids.push(phrase_id.to_string());
        Ok(())
    }

    fn remove(&mut self, phrase_id: &str) -> Result<()> {
        let idx = self
            .phrase_ids
            .iter()
            .position(|id| id == phrase_id)
            .ok_or_else(|| {
                SwaraError::not_found("phrase in strand", format!("{} ({})", phrase_id, self.label))
            })?;
        self.phrase_ids.remove(idx);
        Ok(())
    }
}

/// A tagging graph over phrases borrowed from a piece: every member
/// phrase belongs to at most one strand, or is loose.
#[derive(Debug, Clone)]
pub struct Assemblage<'a> {
    pub instrument: Instrument,
    pub name: String,
    pub id: String,
    phrases: Vec<&'a Phrase>,
    strands: Vec<Strand>,
}

impl<'a> Assemblage<'a> {
    pub fn new(instrument: Instrument, name: &str, id: Option<String>) -> Self {
        Assemblage {
            instrument,
            name: name.to_string(),
            id: id.unwrap_or_else(|| UniqueId::new_v4().to_string()),
            phrases: Vec::new(),
            strands: Vec::new(),
        }
    }

    /// Rebuild from a descriptor; every referenced phrase id must be in
    /// `phrases`.
    pub fn from_descriptor(descriptor: &AssemblageDescriptor, phrases: &[&'a Phrase]) -> Result<Self> {
        let find = |id: &str| {
            phrases
                .iter()
                .copied()
                .find(|p| p.unique_id.as_str() == id)
                .ok_or_else(|| SwaraError::not_found("phrase", id))
        };
        let mut assemblage =
            Assemblage::new(descriptor.instrument, &descriptor.name, Some(descriptor.id.clone()));
        for strand in &descriptor.strands {
            assemblage.add_strand(&strand.label, Some(strand.id.clone()))?;
            for phrase_id in &strand.phrase_ids {
                assemblage.add_phrase(find(phrase_id)?, Some(&strand.id))?;
            }
        }
        for phrase_id in &descriptor.loose_phrase_ids {
            assemblage.add_phrase(find(phrase_id)?, None)?;
        }
        Ok(assemblage)
    }

    pub fn phrases(&self) -> &[&'a Phrase] {
        &self.phrases
    }

    pub fn strands(&self) -> &[Strand] {
        &self.strands
    }

    pub fn add_strand(&mut self, label: &str, id: Option<String>) -> Result<&Strand> {
        if self.strands.iter().any(|s| s.label == label) {
            return Err(SwaraError::duplicate("strand", label));
        }
        self.strands.push(Strand::new(label, id));
        Ok(&self.strands[self.strands.len() - 1])
    }

    pub fn remove_strand(&mut self, id: &str) -> Result<Strand> {
        let idx = self
            .strands
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SwaraError::not_found("strand", id))?;
        Ok(self.strands.remove(idx))
    }

    /// Register a phrase, optionally placing it in a strand.
    pub fn add_phrase(&mut self, phrase: &'a Phrase, strand_id: Option<&str>) -> Result<()> {
        let phrase_id = phrase.unique_id.as_str();
        if self.has_phrase(phrase_id) {
            return Err(SwaraError::duplicate("phrase in assemblage", phrase_id));
        }
        let strand = match strand_id {
            Some(id) => Some(self.strand_idx(id)?),
            None => None,
        };
        self.phrases.push(phrase);
        if let Some(idx) = strand {
            self.strands[idx].add(phrase_id)?;
        }
        Ok(())
    }

    /// Drop a phrase from the assemblage and from whichever strand holds it.
    pub fn remove_phrase(&mut self, phrase: &Phrase) -> Result<()> {
        let phrase_id = phrase.unique_id.as_str();
        let idx = self
            .phrases
            .iter()
            .position(|p| p.unique_id.as_str() == phrase_id)
            .ok_or_else(|| SwaraError::not_found("phrase in assemblage", phrase_id))?;
        for strand in self.strands.iter_mut().filter(|s| s.contains(phrase_id)) {
            strand.remove(phrase_id)?;
        }
        self.phrases.remove(idx);
        Ok(())
    }

    /// Move a phrase into `target`; an unknown or absent target just takes
    /// it out of its current strand, leaving it loose.
    pub fn move_phrase_to_strand(&mut self, phrase: &Phrase, target: Option<&str>) -> Result<()> {
        let phrase_id = phrase.unique_id.as_str();
        let source = self.strands.iter().position(|s| s.contains(phrase_id));
        let target = target.and_then(|id| self.strands.iter().position(|s| s.id == id));
        match (source, target) {
            (source, None) => {
                if let Some(s) = source {
                    self.strands[s].remove(phrase_id)?;
                }
            }
            (None, Some(t)) => {
                if !self.has_phrase(phrase_id) {
                    return Err(SwaraError::not_found("phrase in assemblage", phrase_id));
                }
                self.strands[t].add(phrase_id)?;
            }
            (Some(s), Some(t)) => {
                self.strands[s].remove(phrase_id)?;
                self.strands[t].add(phrase_id)?;
            }
        }
        Ok(())
    }

    /// A strand's phrases in time order.
    pub fn strand_phrases(&self, strand_id: &str) -> Result<Vec<&'a Phrase>> {
        let strand = &self.strands[self.strand_idx(strand_id)?];
        let mut phrases: Vec<&'a Phrase> = strand
            .phrase_ids
            .iter()
            .filter_map(|id| self.phrases.iter().copied().find(|p| p.unique_id.as_str() == id))
            .collect();
        sort_by_start(&mut phrases);
        Ok(phrases)
    }

    /// Member phrases in no strand, in time order.
    pub fn loose_phrases(&self) -> Vec<&'a Phrase> {
        let mut loose: Vec<&'a Phrase> = self
            .phrases
            .iter()
            .copied()
            .filter(|p| !self.strands.iter().any(|s| s.contains(p.unique_id.as_str())))
            .collect();
        sort_by_start(&mut loose);
        loose
    }

    pub fn descriptor(&self) -> AssemblageDescriptor {
        AssemblageDescriptor {
            instrument: self.instrument,
            strands: self
                .strands
                .iter()
                .map(|s| StrandDescriptor {
                    label: s.label.clone(),
                    phrase_ids: s.phrase_ids.clone(),
                    id: s.id.clone(),
                })
                .collect(),
            name: self.name.clone(),
            id: self.id.clone(),
            loose_phrase_ids: self
                .loose_phrases()
                .iter()
                .map(|p| p.unique_id.to_string())
                .collect(),
        }
    }

    fn has_phrase(&self, phrase_id: &str) -> bool {
        self.phrases.iter().any(|p| p.unique_id.as_str() == phrase_id)
    }

    fn strand_idx(&self, id: &str) -> Result<usize> {
        self.strands
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SwaraError::not_found("strand", id))
    }
}

fn sort_by_start(phrases: &mut [&Phrase]) {
    phrases.sort_by(|a, b| {
        a.start_time
            .unwrap_or(0.0)
            .total_cmp(&b.start_time.unwrap_or(0.0))
    });
}
