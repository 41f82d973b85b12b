use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ticket::{Ticket, TicketStatus};

pub const DEFAULT_RANKING_SIZE: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingWindow {
    #[default]
    All,
    Yesterday,
    Today,
}

impl RankingWindow {
    fn day(self, now: DateTime<Utc>) -> Option<NaiveDate> {
        match self {
            RankingWindow::All => None,
            RankingWindow::Today => Some(now.date_naive()),
            RankingWindow::Yesterday => Some((now - Duration::days(1)).date_naive()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankingEntry {
    pub position: usize,
    pub name: String,
    pub tickets: u32,
}

/// Top buyers by purchased tickets. Buyers are told apart by phone digits.
pub fn rank(
    tickets: &[Ticket],
    window: RankingWindow,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<RankingEntry> {
    let day = window.day(now);
    let mut buyers: HashMap<String, (String, u32)> = HashMap::new();

    for ticket in tickets {
        if ticket.status != TicketStatus::Purchased {
            continue;
        }

        let purchased_on = ticket.purchased_at.map(|at| at.date_naive());
        if day.is_some() && purchased_on != day {
            continue;
        }

        let key: String = ticket.buyer.phone.chars().filter(char::is_ascii_digit).collect();
        let entry = buyers
            .entry(key)
            .or_insert_with(|| (ticket.buyer.name.trim().to_string(), 0));
        entry.1 += 1;
    }

    let mut ranked: Vec<(String, u32)> = buyers.into_values().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (name, tickets))| RankingEntry {
            position: i + 1,
            name,
            tickets,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{campaign::tests::now, ticket::Buyer};

    fn purchased(number: u32, name: &str, phone: &str, at: DateTime<Utc>) -> Ticket {
        let buyer = Buyer {
            name: name.to_string(),
            email: None,
            phone: phone.to_string(),
            user_id: None,
        };
        let mut ticket = Ticket::reserve(number, buyer, 24, at);
        ticket.confirm(at);
        ticket
    }

    #[test]
    fn test_rank_groups_by_phone() {
        let yesterday = now() - Duration::days(1);
        let tickets = vec![
            purchased(1, "Ana", "(11) 90000-0001", now()),
            purchased(2, "Ana", "11900000001", yesterday),
            purchased(3, "Bruno", "11900000002", now()),
            Ticket::reserve(
                4,
                Buyer {
                    name: "Carla".to_string(),
                    email: None,
                    phone: "11900000003".to_string(),
                    user_id: None,
                },
                24,
                now(),
            ),
        ];

        let all = rank(&tickets, RankingWindow::All, now(), 10);
        assert_eq!(
            all,
            vec![
                RankingEntry {
                    position: 1,
                    name: "Ana".to_string(),
                    tickets: 2
                },
                RankingEntry {
                    position: 2,
                    name: "Bruno".to_string(),
                    tickets: 1
                },
            ]
        );

        let today = rank(&tickets, RankingWindow::Today, now(), 10);
        assert_eq!(today.len(), 2);
        assert!(today.iter().all(|e| e.tickets == 1));

        let yesterday = rank(&tickets, RankingWindow::Yesterday, now(), 10);
        assert_eq!(yesterday.len(), 1);
        assert_eq!(yesterday[0].name, "Ana");
    }

    #[test]
    fn test_rank_limit_and_ties() {
        let tickets = vec![
            purchased(1, "Zeca", "1", now()),
            purchased(2, "Ana", "2", now()),
            purchased(3, "Bia", "3", now()),
        ];

        let top = rank(&tickets, RankingWindow::All, now(), 2);
        let names: Vec<&str> = top.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bia"]);
    }
}
