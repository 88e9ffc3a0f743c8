//! The consistency checks.
//!
//! Local checks look at one rank's snapshot. Global checks run a LowComm
//! phase: every rank packs rows describing its couplings, groups them by
//! partner rank, and the partner merge-joins the incoming rows against its
//! own objects. All global checks are collective.

use std::collections::BTreeMap;

use ddd_core::{ExceptionCode, Gid, Rank};
use ddd_lowcomm::{Comp, LowComm, LowCommError, MsgType, SendMsg};
use ddd_transport::{global_sum, Transport};

use crate::config::{ConsConfig, ConsMode};
use crate::error::Result;
use crate::report::{ConsReport, Inconsistency};
use crate::rows::{CplRow, HolderRow, ROW_SIZE};
use crate::snapshot::{LocalObject, Snapshot};

type Row = [u8; ROW_SIZE];

/// Report every global id held more than once on this rank.
pub fn check_double_obj(snapshot: &Snapshot) -> Vec<Inconsistency> {
    snapshot
        .sorted()
        .windows(2)
        .filter(|pair| pair[0].gid == pair[1].gid)
        .map(|pair| Inconsistency::DuplicateObject { gid: pair[0].gid })
        .collect()
}

/// Report couplings that cannot be right regardless of the other ranks: to
/// `me`, to a rank outside `0..size`, or a second coupling to the same rank.
pub fn check_local_cpl(snapshot: &Snapshot, me: Rank, size: usize) -> Vec<Inconsistency> {
    let mut findings = Vec::new();
    for obj in &snapshot.objects {
        for (i, cpl) in obj.couplings.iter().enumerate() {
            if cpl.rank == me || cpl.rank.index() >= size {
                findings.push(Inconsistency::InvalidCoupling {
                    gid: obj.gid,
                    partner: cpl.rank,
                });
            } else if obj.couplings[..i].iter().any(|c| c.rank == cpl.rank) {
                findings.push(Inconsistency::DuplicateCoupling {
                    gid: obj.gid,
                    partner: cpl.rank,
                });
            }
        }
    }
    findings
}

/// Couplings that can be shipped: in range and not to `me`.
fn partners(obj: &LocalObject, me: Rank, size: usize) -> impl Iterator<Item = Rank> + '_ {
    obj.couplings
        .iter()
        .map(|c| c.rank)
        .filter(move |r| *r != me && r.index() < size)
}

/// Find the local object for `gid`, advancing the merge cursor.
fn join<'a>(local: &[&'a LocalObject], cursor: &mut usize, gid: Gid) -> Option<&'a LocalObject> {
    while *cursor < local.len() && local[*cursor].gid < gid {
        *cursor += 1;
    }
    local.get(*cursor).copied().filter(|o| o.gid == gid)
}

/// Pairwise: check rows from `src` against the local objects.
pub(crate) fn check_cpl_rows(
    me: Rank,
    src: Rank,
    rows: &[CplRow],
    local: &[&LocalObject],
    findings: &mut Vec<Inconsistency>,
) {
    let mut cursor = 0;
    for row in rows {
        let gid = row.gid;
        let Some(obj) = join(local, &mut cursor, gid) else {
            findings.push(Inconsistency::MissingObject { gid, from: src });
            continue;
        };
        if obj.typ != row.typ {
            findings.push(Inconsistency::TypeMismatch {
                gid,
                from: src,
                local: obj.typ,
                remote: row.typ,
            });
            continue;
        }
        if obj.prio != row.dest_prio {
            findings.push(Inconsistency::PriorityMismatch {
                gid,
                from: src,
                holder: me,
                local: obj.prio,
                remote: row.dest_prio,
            });
        }
        match obj.coupling(src) {
            None => findings.push(Inconsistency::MissingCoupling {
                gid,
                from: src,
                holder: src,
            }),
            Some(cpl) if cpl.prio != row.sender_prio => {
                findings.push(Inconsistency::PriorityMismatch {
                    gid,
                    from: src,
                    holder: src,
                    local: cpl.prio,
                    remote: row.sender_prio,
                })
            }
            Some(_) => {}
        }
    }
}

/// All-to-all: check the holder lists from `src` against the local objects.
/// `rows` must be sorted by gid.
pub(crate) fn check_holder_rows(
    me: Rank,
    src: Rank,
    rows: &[HolderRow],
    local: &[&LocalObject],
    findings: &mut Vec<Inconsistency>,
) {
    let mut cursor = 0;
    let mut start = 0;
    while start < rows.len() {
        let gid = rows[start].gid;
        let end = start + rows[start..].iter().take_while(|r| r.gid == gid).count();
        let group = &rows[start..end];
        start = end;

        let Some(obj) = join(local, &mut cursor, gid) else {
            findings.push(Inconsistency::MissingObject { gid, from: src });
            continue;
        };
        if obj.typ != group[0].typ {
            findings.push(Inconsistency::TypeMismatch {
                gid,
                from: src,
                local: obj.typ,
                remote: group[0].typ,
            });
            continue;
        }

        for row in group {
            let local_prio = if row.holder == me {
                Some(obj.prio)
            } else {
                obj.coupling(row.holder).map(|c| c.prio)
            };
            match local_prio {
                None => findings.push(Inconsistency::MissingCoupling {
                    gid,
                    from: src,
                    holder: row.holder,
                }),
                Some(prio) if prio != row.prio => {
                    findings.push(Inconsistency::PriorityMismatch {
                        gid,
                        from: src,
                        holder: row.holder,
                        local: prio,
                        remote: row.prio,
                    })
                }
                Some(_) => {}
            }
        }

        for cpl in &obj.couplings {
            if !group.iter().any(|r| r.holder == cpl.rank) {
                findings.push(Inconsistency::UnlistedHolder {
                    gid,
                    from: src,
                    holder: cpl.rank,
                });
            }
        }
    }
}

/// How a check phase ended on this rank.
enum Exchange {
    Received(Vec<(Rank, Vec<Row>)>),
    /// This rank could not take part and withdrew.
    Withdrew(ExceptionCode),
    /// Another rank withdrew.
    Observed(ExceptionCode),
}

/// Runs the consistency checks over one [`LowComm`] context.
///
/// Registers its two message types on construction, so it must be created at
/// the same point on every rank.
#[derive(Debug, Clone)]
pub struct ConsChecker {
    config: ConsConfig,
    cpl_type: MsgType,
    cpl_rows: Comp,
    all_type: MsgType,
    all_rows: Comp,
}

impl ConsChecker {
    pub fn new<T: Transport>(lc: &mut LowComm<T>, config: ConsConfig) -> Self {
        let cpl_type = lc.new_msg_type("cons_info");
        let cpl_rows = lc.new_table(cpl_type, "couplings", ROW_SIZE);
        let all_type = lc.new_msg_type("cons_info_all");
        let all_rows = lc.new_table(all_type, "holders", ROW_SIZE);
        Self {
            config,
            cpl_type,
            cpl_rows,
            all_type,
            all_rows,
        }
    }

    pub fn config(&self) -> &ConsConfig {
        &self.config
    }

    /// Check every coupling against its mirror on the partner rank.
    /// Collective.
    pub async fn check_global_cpl<T: Transport>(
        &self,
        lc: &mut LowComm<T>,
        snapshot: &Snapshot,
    ) -> Result<Vec<Inconsistency>> {
        let me = lc.rank();
        let size = lc.transport().size();
        let local = snapshot.sorted();

        let mut outgoing: BTreeMap<Rank, Vec<Row>> = BTreeMap::new();
        for obj in &local {
            for cpl in obj.couplings.iter().filter(|c| c.rank != me && c.rank.index() < size) {
                let row = CplRow {
                    gid: obj.gid,
                    typ: obj.typ,
                    sender_prio: obj.prio,
                    dest_prio: cpl.prio,
                };
                outgoing.entry(cpl.rank).or_default().push(row.encode());
            }
        }

        let mut findings = Vec::new();
        match exchange(lc, self.cpl_type, self.cpl_rows, outgoing).await? {
            Exchange::Received(received) => {
                for (src, rows) in received {
                    let mut rows: Vec<CplRow> = rows.iter().map(|r| CplRow::decode(r)).collect();
                    rows.sort_by_key(|r| r.gid);
                    check_cpl_rows(me, src, &rows, &local, &mut findings);
                }
            }
            Exchange::Withdrew(code) => findings.push(Inconsistency::PhaseAborted { code }),
            Exchange::Observed(code) => {
                tracing::debug!(rank = me.0, %code, "cons: coupling check aborted elsewhere");
            }
        }
        Ok(findings)
    }

    /// Check that all holders of an object agree on its full holder set and
    /// priorities. Collective.
    ///
    /// For every coupling, the whole holder list of the object travels to the
    /// partner, so an object with `h` holders costs `h * (h - 1)` rows.
    pub async fn check_global_cpl_all<T: Transport>(
        &self,
        lc: &mut LowComm<T>,
        snapshot: &Snapshot,
    ) -> Result<Vec<Inconsistency>> {
        let me = lc.rank();
        let size = lc.transport().size();
        let local = snapshot.sorted();

        let mut outgoing: BTreeMap<Rank, Vec<Row>> = BTreeMap::new();
        for obj in &local {
            let mut holders: Vec<HolderRow> = std::iter::once((me, obj.prio))
                .chain(obj.couplings.iter().map(|c| (c.rank, c.prio)))
                .map(|(holder, prio)| HolderRow {
                    gid: obj.gid,
                    typ: obj.typ,
                    holder,
                    prio,
                })
                .collect();
            holders.sort_by_key(|h| h.holder);

            for partner in partners(obj, me, size) {
                outgoing
                    .entry(partner)
                    .or_default()
                    .extend(holders.iter().map(HolderRow::encode));
            }
        }

        let mut findings = Vec::new();
        match exchange(lc, self.all_type, self.all_rows, outgoing).await? {
            Exchange::Received(received) => {
                for (src, rows) in received {
                    let mut rows: Vec<HolderRow> =
                        rows.iter().map(|r| HolderRow::decode(r)).collect();
                    rows.sort_by_key(|r| (r.gid, r.holder));
                    check_holder_rows(me, src, &rows, &local, &mut findings);
                }
            }
            Exchange::Withdrew(code) => findings.push(Inconsistency::PhaseAborted { code }),
            Exchange::Observed(code) => {
                tracing::debug!(rank = me.0, %code, "cons: holder check aborted elsewhere");
            }
        }
        Ok(findings)
    }

    /// Run every check and sum the findings over all ranks. Collective.
    ///
    /// Never modifies the snapshot.
    pub async fn cons_check<T: Transport>(
        &self,
        lc: &mut LowComm<T>,
        snapshot: &Snapshot,
    ) -> Result<ConsReport> {
        let me = lc.rank();
        let size = lc.transport().size();

        let mut findings = check_double_obj(snapshot);
        findings.extend(check_local_cpl(snapshot, me, size));
        findings.extend(self.check_global_cpl(lc, snapshot).await?);
        if self.config.mode == ConsMode::AllToAll {
            findings.extend(self.check_global_cpl_all(lc, snapshot).await?);
        }

        for finding in &findings {
            tracing::warn!(rank = me.0, "cons: {finding}");
        }

        let total = global_sum(lc.transport(), findings.len() as u64).await?;
        tracing::debug!(
            rank = me.0,
            local = findings.len(),
            total,
            objects = snapshot.objects.len(),
            couplings = snapshot.coupling_count(),
            "cons: check done"
        );
        Ok(ConsReport::new(me, total, findings, self.config.max_reported))
    }
}

/// One LowComm phase shipping `outgoing` rows, one message per partner.
async fn exchange<T: Transport>(
    lc: &mut LowComm<T>,
    msg_type: MsgType,
    table: Comp,
    outgoing: BTreeMap<Rank, Vec<Row>>,
) -> Result<Exchange> {
    let mut msgs = Vec::with_capacity(outgoing.len());
    for (&dest, rows) in &outgoing {
        let msg = lc.new_send_msg(msg_type, dest);
        lc.set_table_len(msg, table, rows.len());
        msgs.push(msg);
    }

    let mut failed = None;
    for (&msg, rows) in msgs.iter().zip(outgoing.values()) {
        if let Err(e) = lc.prepare_send(msg) {
            tracing::warn!(rank = lc.rank().0, error = %e, "cons: cannot build check message");
            failed = Some(e.exception());
            break;
        }
        for (entry, row) in lc.table_mut(msg, table).chunks_exact_mut(ROW_SIZE).zip(rows) {
            entry.copy_from_slice(row);
        }
    }
    if let Some(code) = failed {
        let code = lc.abort(code).await;
        lc.cleanup();
        return Ok(Exchange::Withdrew(code));
    }

    match lc.connect(msg_type).await {
        Ok(_) => {}
        Err(LowCommError::Exception(code)) => {
            lc.cleanup();
            return Ok(Exchange::Observed(code));
        }
        Err(LowCommError::Withdrawn { code, source }) => {
            tracing::warn!(
                rank = lc.rank().0,
                error = %source,
                "cons: cannot receive check messages"
            );
            lc.cleanup();
            return Ok(Exchange::Withdrew(code));
        }
        Err(e) => {
            lc.cleanup();
            return Err(e.into());
        }
    }

    let received = drain(lc, &msgs, table).await;
    lc.cleanup();
    Ok(Exchange::Received(received?))
}

async fn drain<T: Transport>(
    lc: &mut LowComm<T>,
    msgs: &[SendMsg],
    table: Comp,
) -> Result<Vec<(Rank, Vec<Row>)>> {
    for &msg in msgs {
        lc.send(msg)?;
    }
    let recvs = lc.communicate().await?;
    Ok(recvs
        .into_iter()
        .map(|r| {
            let rows = lc
                .table_entries(r, table)
                .map(|entry| {
                    let mut row = [0u8; ROW_SIZE];
                    row.copy_from_slice(entry);
                    row
                })
                .collect();
            (lc.recv_src(r), rows)
        })
        .collect())
}
