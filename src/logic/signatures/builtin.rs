//! Built-in Signature Database
//!
//! Default in-memory signatures so the engine works without configuration.
//! Callers with their own database pass it to `SignatureStore::new`.

use once_cell::sync::Lazy;

use super::types::Signature;

static BUILTIN_SIGNATURES: Lazy<Vec<Signature>> = Lazy::new(build_signatures);
static BUILTIN_ELEVATED: Lazy<Vec<Signature>> = Lazy::new(build_elevated);

pub fn default_signatures() -> Vec<Signature> {
    BUILTIN_SIGNATURES.clone()
}

pub fn default_elevated_signatures() -> Vec<Signature> {
    BUILTIN_ELEVATED.clone()
}

// ============================================================================
// KNOWN MALWARE
// ============================================================================

fn build_signatures() -> Vec<Signature> {
    vec![
        // 1. Ransomware
        Signature::new("Generic Ransomware", "Ransomware", 10)
            .behavior(
                "Payload Execution",
                0.15,
                &["unknown executable", "suspicious origin", "dropper", "payload"],
            )
            .behavior(
                "Backup Deletion",
                0.2,
                &["vssadmin delete shadows", "shadow copy", "wbadmin delete", "bcdedit /set"],
            )
            .behavior(
                "Security Evasion",
                0.2,
                &["antivirus", "windows defender", "disable edr", "security service stopped"],
            )
            .behavior(
                "Mass Encryption",
                0.25,
                &[".encrypted", ".locked", "mass file encryption", "readme_decrypt"],
            )
            .behavior("C2 Communication", 0.2, &[".onion", "tor network", "tor2web"]),

        // 2. Credential stealer
        Signature::new("Credential Stealer", "Infostealer", 8)
            .behavior(
                "Credential Dumping",
                0.35,
                &["mimikatz", "sekurlsa", "lsass.dmp", "procdump -ma lsass"],
            )
            .behavior(
                "Browser Data Theft",
                0.3,
                &["login data", "cookies.sqlite", "key4.db", "browser credentials"],
            )
            .behavior(
                "Data Exfiltration",
                0.35,
                &["pastebin.com", "discord webhook", "telegram bot api", "exfiltrat"],
            ),

        // 3. Remote access trojan
        Signature::new("Remote Access Trojan", "Trojan", 9)
            .behavior(
                "Registry Persistence",
                0.3,
                &["\\currentversion\\run", "runonce", "scheduled task created"],
            )
            .behavior(
                "Reverse Shell",
                0.4,
                &["reverse shell", "nc -e", "bash -i >& /dev/tcp", ":4444"],
            )
            .behavior("Keylogging", 0.3, &["setwindowshookex", "keylog", "getasynckeystate"]),

        // 4. Cryptominer
        Signature::new("Cryptominer", "Resource Hijacking", 6)
            .behavior("Miner Execution", 0.5, &["xmrig", "minerd", "cryptonight"])
            .behavior("Mining Pool Connection", 0.3, &["stratum+tcp", "pool.minexmr", "nanopool"])
            .behavior("Cron Persistence", 0.2, &["crontab", "/etc/cron.d"]),

        // 5. Worm
        Signature::new("Network Worm", "Worm", 9)
            .behavior(
                "Lateral Movement",
                0.4,
                &["psexec", "wmic /node", "smb exploit", "eternalblue"],
            )
            .behavior("Network Spreading", 0.3, &["self-propagat", "copied to admin$", "ipc$"])
            .behavior("Payload Execution", 0.3, &["remote service created", "payload"]),

        // 6. EDR killer
        Signature::new("EDR Killer", "Defense Evasion", 8)
            .behavior(
                "EDR Killer Driver",
                0.5,
                &["vulnerable driver", "byovd", "rtcore64.sys", "gdrv.sys"],
            )
            .behavior(
                "Security Process Termination",
                0.5,
                &["msmpeng.exe terminated", "edr process killed", "sense service stopped"],
            ),
    ]
}

// ============================================================================
// AI-POWERED THREATS (ELEVATED)
// ============================================================================

fn build_elevated() -> Vec<Signature> {
    vec![
        Signature::new("AI-Polymorphic Malware", "AI-Powered Attack", 10)
            .behavior(
                "LLM API Calls",
                0.4,
                &["api.openai.com", "api.gemini.google.com", "api.anthropic.com", "generativelanguage"],
            )
            .behavior(
                "Runtime Self-Modification",
                0.35,
                &["self-modif", "rewrites own code", "polymorphic", "code regenerated"],
            )
            .behavior(
                "Dynamic Code Execution",
                0.25,
                &["exec(", "eval(", "compile(", "invoke-expression"],
            ),

        Signature::new("Autonomous AI Agent Attack", "AI-Powered Attack", 10)
            .behavior(
                "Machine-Speed Reconnaissance",
                0.25,
                &["automated scan", "enumerat", "service discovery"],
            )
            .behavior(
                "Automated Credential Harvesting",
                0.25,
                &["credential harvest", "password dump", "token extraction"],
            )
            .behavior(
                "Generated Exploit Code",
                0.25,
                &["exploit generated", "custom exploit", "auto-exploit"],
            )
            .behavior(
                "Agent Orchestration",
                0.25,
                &["agent task", "tool call", "llm agent", "autonomous operation"],
            ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sets_non_empty_and_valid() {
        let sigs = default_signatures();
        let elevated = default_elevated_signatures();
        assert!(!sigs.is_empty());
        assert!(!elevated.is_empty());
        for sig in sigs.iter().chain(elevated.iter()) {
            assert!(sig.validate().is_ok(), "{} should be valid", sig.name);
            assert!(sig.total_weight() > 0.0);
        }
    }

    #[test]
    fn test_ransomware_weights_sum_to_one() {
        let sigs = default_signatures();
        let ransomware = sigs.iter().find(|s| s.category == "Ransomware").unwrap();
        assert!((ransomware.total_weight() - 1.0).abs() < 1e-9);
    }
}
