// Final participant tally posted when a CTF completes.

use super::ctf_models::{Participant, ParticipantStatus};

/// Discord embed fields hold at most 1024 characters.
pub const DEFAULT_PAGE_SIZE: usize = 1024;

/// Participants split by status, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub event_name: String,
    pub active: Vec<String>,
    pub left: Vec<String>,
    page_size: usize,
}

impl Tally {
    /// Partition participants (already ordered by join time) into active and left.
    pub fn new(event_name: &str, participants: &[Participant], page_size: usize) -> Self {
        let (active, left): (Vec<&Participant>, Vec<&Participant>) = participants
            .iter()
            .partition(|p| p.status == ParticipantStatus::Active);

        Self {
            event_name: event_name.to_string(),
            active: active.into_iter().map(|p| p.display_name.clone()).collect(),
            left: left.into_iter().map(|p| p.display_name.clone()).collect(),
            page_size: page_size.max(1),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn left_count(&self) -> usize {
        self.left.len()
    }

    /// Numbered active list split into blocks of at most `page_size` characters.
    pub fn active_pages(&self) -> Vec<String> {
        paginate(&numbered(&self.active), self.page_size)
    }

    /// Numbered left list split into blocks of at most `page_size` characters.
    pub fn left_pages(&self) -> Vec<String> {
        paginate(&numbered(&self.left), self.page_size)
    }
}

fn numbered(names: &[String]) -> Vec<String> {
    names
        .iter()
        .enumerate()
        .map(|(index, name)| format!("{}. {}", index + 1, name))
        .collect()
}

/// Pack lines into newline-joined blocks no longer than `limit` characters.
///
/// Lines are kept whole when they fit; a single line longer than the limit is
/// cut on character boundaries.
pub fn paginate(lines: &[String], limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut pages = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in lines {
        let line_len = line.chars().count();

        if line_len > limit {
            if !current.is_empty() {
                pages.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                pages.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            line_len
        } else {
            current_len + 1 + line_len
        };

        if needed > limit {
            pages.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        pages.push(current);
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn participant(name: &str, status: ParticipantStatus) -> Participant {
        Participant {
            event_id: 1,
            user_id: 1,
            display_name: name.to_string(),
            status,
            joined_at: Utc::now(),
            left_at: None,
        }
    }

    #[test]
    fn test_partitions_by_status() {
        let participants = vec![
            participant("alice", ParticipantStatus::Active),
            participant("bob", ParticipantStatus::Left),
            participant("carol", ParticipantStatus::Active),
        ];
        let tally = Tally::new("Pascal CTF", &participants, DEFAULT_PAGE_SIZE);

        assert_eq!(tally.active_count(), 2);
        assert_eq!(tally.left_count(), 1);
        assert_eq!(tally.active_pages(), vec!["1. alice\n2. carol".to_string()]);
        assert_eq!(tally.left_pages(), vec!["1. bob".to_string()]);
    }

    #[test]
    fn test_empty_lists_have_no_pages() {
        let tally = Tally::new("Empty CTF", &[], DEFAULT_PAGE_SIZE);
        assert!(tally.active_pages().is_empty());
        assert!(tally.left_pages().is_empty());
    }

    #[test]
    fn test_pages_respect_limit() {
        let lines: Vec<String> = (0..300).map(|i| format!("{i}. player_{i:04}")).collect();
        let pages = paginate(&lines, DEFAULT_PAGE_SIZE);

        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.chars().count() <= DEFAULT_PAGE_SIZE);
        }
        // Nothing lost or reordered.
        let rejoined: Vec<String> = pages
            .iter()
            .flat_map(|p| p.lines().map(str::to_string))
            .collect();
        assert_eq!(rejoined, lines);
    }

    #[test]
    fn test_exact_fit_stays_on_one_page() {
        let lines = vec!["abcd".to_string(), "efgh".to_string()];
        assert_eq!(paginate(&lines, 9), vec!["abcd\nefgh".to_string()]);
        assert_eq!(
            paginate(&lines, 8),
            vec!["abcd".to_string(), "efgh".to_string()]
        );
    }

    #[test]
    fn test_oversized_line_is_split_on_chars() {
        let lines = vec!["ab".to_string(), "ééééé".to_string(), "cd".to_string()];
        assert_eq!(
            paginate(&lines, 2),
            vec![
                "ab".to_string(),
                "éé".to_string(),
                "éé".to_string(),
                "é".to_string(),
                "cd".to_string(),
            ]
        );
    }
}
