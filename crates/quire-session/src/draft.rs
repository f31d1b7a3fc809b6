//! Draft shapes and pending-change predicates.
//!
//! A draft is the locally held, uncommitted copy of one block's editable
//! fields. Every nullable server field is coalesced to an empty string (or an
//! empty list) when the draft is derived, so comparisons never see `null`
//! against `""`.
//!
//! Pending changes are computed field by field against the baseline. Nothing
//! here compares structurally: each field has its own notion of "same"
//! (dialogue turn ids are local bookkeeping and never count as a change; theme
//! tags compare in normalized form).

use serde::{Deserialize, Serialize};

use quire_types::{
    DialogueContent, DialogueTurn, MetadataContent, MetadataKind, ParagraphContent,
    SceneBoundaryContent,
};

fn coalesce(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Split a comma-separated tag string into trimmed, non-empty, unique tags.
///
/// Order of first occurrence is preserved.
pub fn normalize_theme_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

// ============================================================================
// Paragraph
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParagraphDraft {
    pub text: String,
}

impl ParagraphDraft {
    pub fn from_content(content: &ParagraphContent) -> Self {
        Self {
            text: coalesce(&content.text),
        }
    }

    pub fn differs_from(&self, baseline: &Self) -> bool {
        self.text != baseline.text
    }
}

// ============================================================================
// Dialogue
// ============================================================================

/// Editable field of a dialogue turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueTurnField {
    SpeakerName,
    SpeakerId,
    Utterance,
    StageDirection,
}

/// One turn of a dialogue draft. `id` is always present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnDraft {
    pub id: String,
    pub speaker_name: String,
    pub speaker_id: String,
    pub utterance: String,
    pub stage_direction: String,
}

impl TurnDraft {
    /// An empty turn with a freshly generated id.
    pub fn blank() -> Self {
        Self {
            id: new_turn_id(),
            speaker_name: String::new(),
            speaker_id: String::new(),
            utterance: String::new(),
            stage_direction: String::new(),
        }
    }

    /// Copy a canonical turn, generating an id when the server has none.
    pub fn from_turn(turn: &DialogueTurn) -> Self {
        Self::from_turn_with_fallback_id(turn, None)
    }

    fn from_turn_with_fallback_id(turn: &DialogueTurn, fallback: Option<&str>) -> Self {
        let id = match (&turn.id, fallback) {
            (Some(id), _) if !id.is_empty() => id.clone(),
            (_, Some(fallback)) => fallback.to_string(),
            _ => new_turn_id(),
        };
        Self {
            id,
            speaker_name: coalesce(&turn.speaker_name),
            speaker_id: coalesce(&turn.speaker_id),
            utterance: coalesce(&turn.utterance),
            stage_direction: coalesce(&turn.stage_direction),
        }
    }

    /// Whether the user-visible fields match (ids are ignored).
    pub fn same_content(&self, other: &Self) -> bool {
        self.speaker_name == other.speaker_name
            && self.speaker_id == other.speaker_id
            && self.utterance == other.utterance
            && self.stage_direction == other.stage_direction
    }

    /// A copy with one field replaced.
    pub fn with_field(&self, field: DialogueTurnField, value: &str) -> Self {
        let mut next = self.clone();
        match field {
            DialogueTurnField::SpeakerName => next.speaker_name = value.to_string(),
            DialogueTurnField::SpeakerId => next.speaker_id = value.to_string(),
            DialogueTurnField::Utterance => next.utterance = value.to_string(),
            DialogueTurnField::StageDirection => next.stage_direction = value.to_string(),
        }
        next
    }
}

fn new_turn_id() -> String {
    format!("turn-{}", uuid::Uuid::new_v4().simple())
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DialogueDraft {
    pub turns: Vec<TurnDraft>,
}

impl DialogueDraft {
    pub fn from_content(content: &DialogueContent) -> Self {
        Self {
            turns: content.turns.iter().map(TurnDraft::from_turn).collect(),
        }
    }

    /// Like [`from_content`](Self::from_content), but turns without a server id
    /// keep the id `previous` assigned at the same position, so a refresh does
    /// not churn locally generated ids.
    pub fn from_content_reusing(content: &DialogueContent, previous: &DialogueDraft) -> Self {
        let server_ids: Vec<&str> = content
            .turns
            .iter()
            .filter_map(|t| t.id.as_deref())
            .collect();
        Self {
            turns: content
                .turns
                .iter()
                .enumerate()
                .map(|(idx, turn)| {
                    let fallback = previous
                        .turns
                        .get(idx)
                        .map(|t| t.id.as_str())
                        .filter(|id| !server_ids.contains(id));
                    TurnDraft::from_turn_with_fallback_id(turn, fallback)
                })
                .collect(),
        }
    }

    pub fn differs_from(&self, baseline: &Self) -> bool {
        self.turns.len() != baseline.turns.len()
            || self
                .turns
                .iter()
                .zip(&baseline.turns)
                .any(|(draft, base)| !draft.same_content(base))
    }

    pub fn contains(&self, turn_id: &str) -> bool {
        self.turns.iter().any(|t| t.id == turn_id)
    }
}

// ============================================================================
// Scene boundary
// ============================================================================

/// Editable field of a scene boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneBoundaryField {
    Label,
    Summary,
    LocationName,
    Timestamp,
    Mood,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SceneBoundaryDraft {
    pub label: String,
    pub summary: String,
    pub location_name: String,
    pub timestamp: String,
    pub mood: String,
}

impl SceneBoundaryDraft {
    pub fn from_content(content: &SceneBoundaryContent) -> Self {
        let details = content.scene_details.clone().unwrap_or_default();
        Self {
            label: coalesce(&content.label),
            summary: coalesce(&content.summary),
            location_name: coalesce(&details.location_name),
            timestamp: coalesce(&details.timestamp),
            mood: coalesce(&details.mood),
        }
    }

    pub fn with_field(&self, field: SceneBoundaryField, value: &str) -> Self {
        let mut next = self.clone();
        let slot = match field {
            SceneBoundaryField::Label => &mut next.label,
            SceneBoundaryField::Summary => &mut next.summary,
            SceneBoundaryField::LocationName => &mut next.location_name,
            SceneBoundaryField::Timestamp => &mut next.timestamp,
            SceneBoundaryField::Mood => &mut next.mood,
        };
        *slot = value.to_string();
        next
    }

    pub fn differs_from(&self, baseline: &Self) -> bool {
        self.label != baseline.label
            || self.summary != baseline.summary
            || self.location_name != baseline.location_name
            || self.timestamp != baseline.timestamp
            || self.mood != baseline.mood
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Editable field of a metadata block, across all kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Text,
    PovCharacter,
    StoryTime,
    /// Comma-separated in the draft; normalized to a list on save.
    ThemeTags,
    Title,
    Subtitle,
    Epigraph,
    EpigraphAttribution,
}

impl MetadataField {
    /// The kind whose field group owns this field.
    pub fn kind(&self) -> MetadataKind {
        match self {
            MetadataField::Text => MetadataKind::Metadata,
            MetadataField::PovCharacter | MetadataField::StoryTime | MetadataField::ThemeTags => {
                MetadataKind::Context
            }
            MetadataField::Title
            | MetadataField::Subtitle
            | MetadataField::Epigraph
            | MetadataField::EpigraphAttribution => MetadataKind::ChapterHeader,
        }
    }
}

/// Metadata draft. All field groups are held regardless of the session's
/// current kind, so switching kinds back and forth before saving loses nothing
/// locally.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataDraft {
    pub text: String,
    pub pov_character: String,
    pub story_time: String,
    pub theme_tags: String,
    pub title: String,
    pub subtitle: String,
    pub epigraph: String,
    pub epigraph_attribution: String,
}

impl MetadataDraft {
    pub fn from_content(content: &MetadataContent) -> Self {
        Self {
            text: coalesce(&content.text),
            pov_character: coalesce(&content.pov_character),
            story_time: coalesce(&content.story_time),
            theme_tags: content.theme_tags.join(", "),
            title: coalesce(&content.title),
            subtitle: coalesce(&content.subtitle),
            epigraph: coalesce(&content.epigraph),
            epigraph_attribution: coalesce(&content.epigraph_attribution),
        }
    }

    pub fn field(&self, field: MetadataField) -> &str {
        match field {
            MetadataField::Text => &self.text,
            MetadataField::PovCharacter => &self.pov_character,
            MetadataField::StoryTime => &self.story_time,
            MetadataField::ThemeTags => &self.theme_tags,
            MetadataField::Title => &self.title,
            MetadataField::Subtitle => &self.subtitle,
            MetadataField::Epigraph => &self.epigraph,
            MetadataField::EpigraphAttribution => &self.epigraph_attribution,
        }
    }

    pub fn with_field(&self, field: MetadataField, value: &str) -> Self {
        let mut next = self.clone();
        let slot = match field {
            MetadataField::Text => &mut next.text,
            MetadataField::PovCharacter => &mut next.pov_character,
            MetadataField::StoryTime => &mut next.story_time,
            MetadataField::ThemeTags => &mut next.theme_tags,
            MetadataField::Title => &mut next.title,
            MetadataField::Subtitle => &mut next.subtitle,
            MetadataField::Epigraph => &mut next.epigraph,
            MetadataField::EpigraphAttribution => &mut next.epigraph_attribution,
        };
        *slot = value.to_string();
        next
    }

    pub fn differs_from(&self, baseline: &Self) -> bool {
        self.text != baseline.text
            || self.pov_character != baseline.pov_character
            || self.story_time != baseline.story_time
            || normalize_theme_tags(&self.theme_tags) != normalize_theme_tags(&baseline.theme_tags)
            || self.title != baseline.title
            || self.subtitle != baseline.subtitle
            || self.epigraph != baseline.epigraph
            || self.epigraph_attribution != baseline.epigraph_attribution
    }
}
