/// Routines every compiled program links against: run-time error stops,
/// buffered console output and input.
///
/// Calling convention of the I/O routines: `gr1` holds the value (or the
/// address to read into), `gr2` the field width, 0 meaning as narrow as
/// possible. All of them preserve every register through `RPUSH`/`RPOP`.
const RUNTIME_LIBRARY: &str = r"EOVF
	CALL	WRITELINE
	LAD	gr1, EOVF1
	LD	gr2, gr0
	CALL	WRITESTR
	CALL	WRITELINE
	SVC	1	; overflow error stop
EOVF1	DC	'***** Run-Time Error : Overflow *****'
E0DIV
	JNZ	EOVF
	CALL	WRITELINE
	LAD	gr1, E0DIV1
	LD	gr2, gr0
	CALL	WRITESTR
	CALL	WRITELINE
	SVC	2	; zero-divide error stop
E0DIV1	DC	'***** Run-Time Error : Zero-Divide *****'
EROV
	CALL	WRITELINE
	LAD	gr1, EROV1
	LD	gr2, gr0
	CALL	WRITESTR
	CALL	WRITELINE
	SVC	3	; range-over error stop
EROV1	DC	'***** Run-Time Error : Range-Over in Array Index *****'
WRITECHAR
	RPUSH
	LD	gr6, SPACE
	LD	gr7, OBUFSIZE
WC1
	SUBA	gr2, ONE	; while (--c > 0) {
	JZE	WC2
	JMI	WC2
	ST	gr6, OBUF, gr7	;   *p++ = ' ';
	CALL	BOVFCHECK
	JUMP	WC1	; }
WC2
	ST	gr1, OBUF, gr7	; *p++ = gr1;
	CALL	BOVFCHECK
	ST	gr7, OBUFSIZE
	RPOP
	RET
WRITESTR
	RPUSH
	LD	gr6, gr1	; p = gr1;
WS1
	LD	gr4, 0, gr6	; while (*p != '\0') {
	JZE	WS2
	ADDA	gr6, ONE	;   p++;
	SUBA	gr2, ONE	;   c--;
	JUMP	WS1	; }
WS2
	LD	gr7, OBUFSIZE	; q = OBUFSIZE;
	LD	gr5, SPACE
WS3
	SUBA	gr2, ONE	; while (--c >= 0) {
	JMI	WS4
	ST	gr5, OBUF, gr7	;   *q++ = ' ';
	CALL	BOVFCHECK
	JUMP	WS3	; }
WS4
	LD	gr4, 0, gr1	; while (*gr1 != '\0') {
	JZE	WS5
	ST	gr4, OBUF, gr7	;   *q++ = *gr1++;
	ADDA	gr1, ONE
	CALL	BOVFCHECK
	JUMP	WS4	; }
WS5
	ST	gr7, OBUFSIZE	; OBUFSIZE = q;
	RPOP
	RET
BOVFCHECK
	ADDA	gr7, ONE
	CPA	gr7, BOVFLEVEL
	JMI	BOVF1
	CALL	WRITELINE
	LD	gr7, OBUFSIZE
BOVF1
	RET
BOVFLEVEL	DC	256
WRITEINT
	RPUSH
	LD	gr7, gr0	; flag = 0;
	CPA	gr1, gr0	; if (gr1 >= 0) goto WI1;
	JPL	WI1
	JZE	WI1
	LD	gr4, gr0	; gr1 = -gr1;
	SUBA	gr4, gr1
	CPA	gr4, gr1
	JZE	WI6
	LD	gr1, gr4
	LD	gr7, ONE	; flag = 1;
WI1
	LD	gr6, SIX	; p = INTBUF + 6;
	ST	gr0, INTBUF, gr6	; *p = '\0';
	SUBA	gr6, ONE	; p--;
	CPA	gr1, gr0	; if (gr1 == 0)
	JNZ	WI2
	LD	gr4, ZERO	;   *p = '0';
	ST	gr4, INTBUF, gr6
	JUMP	WI5
WI2
	CPA	gr1, gr0	; while (gr1 != 0) {
	JZE	WI3
	LD	gr5, gr1	;   gr5 = gr1 - (gr1 / 10) * 10;
	DIVA	gr1, TEN	;   gr1 /= 10;
	LD	gr4, gr1
	MULA	gr4, TEN
	SUBA	gr5, gr4
	ADDA	gr5, ZERO	;   gr5 += '0';
	ST	gr5, INTBUF, gr6	;   *p = gr5;
	SUBA	gr6, ONE	;   p--;
	JUMP	WI2	; }
WI3
	CPA	gr7, gr0	; if (flag != 0)
	JZE	WI4
	LD	gr4, MINUS	;   *p = '-';
	ST	gr4, INTBUF, gr6
	JUMP	WI5
WI4
	ADDA	gr6, ONE	; else p++;
WI5
	LAD	gr1, INTBUF, gr6	; gr1 = p;
	CALL	WRITESTR
	RPOP
	RET
WI6
	LAD	gr1, MMINT
	CALL	WRITESTR
	RPOP
	RET
MMINT	DC	'-32768'
WRITEBOOL
	RPUSH
	CPA	gr1, gr0	; if (gr1 != 0)
	JZE	WB1
	LAD	gr1, WBTRUE	;   gr1 = 'TRUE';
	JUMP	WB2
WB1
	LAD	gr1, WBFALSE	; else gr1 = 'FALSE';
WB2
	CALL	WRITESTR
	RPOP
	RET
WBTRUE	DC	'TRUE'
WBFALSE	DC	'FALSE'
WRITELINE
	RPUSH
	LD	gr7, OBUFSIZE
	LD	gr6, NEWLINE
	ST	gr6, OBUF, gr7
	ADDA	gr7, ONE
	ST	gr7, OBUFSIZE
	OUT	OBUF, OBUFSIZE
	ST	gr0, OBUFSIZE
	RPOP
	RET
FLUSH
	RPUSH
	LD	gr7, OBUFSIZE
	JZE	FL1
	CALL	WRITELINE
FL1
	RPOP
	RET
READCHAR
	RPUSH
	LD	gr5, RPBBUF	; if (RPBBUF != '\0') {
	JZE	RC0
	ST	gr5, 0, gr1	;   *gr1 = RPBBUF;
	ST	gr0, RPBBUF	;   RPBBUF = '\0';
	JUMP	RC3	;   return; }
RC0
	LD	gr7, INP	; inp = INP;
	LD	gr6, IBUFSIZE	; if (IBUFSIZE == 0) {
	JNZ	RC1
	IN	IBUF, IBUFSIZE	;   IN();
	LD	gr7, gr0	;   inp = 0; }
RC1
	CPA	gr7, IBUFSIZE	; if (inp == IBUFSIZE) {
	JNZ	RC2
	LD	gr5, NEWLINE	;   *gr1 = '\n';
	ST	gr5, 0, gr1
	ST	gr0, IBUFSIZE	;   IBUFSIZE = INP = 0;
	ST	gr0, INP
	JUMP	RC3	; }
RC2
	LD	gr5, IBUF, gr7	; else *gr1 = *inp++;
	ADDA	gr7, ONE
	ST	gr5, 0, gr1
	ST	gr7, INP	; INP = inp;
RC3
	RPOP
	RET
READINT
	RPUSH
RI1
	CALL	READCHAR	; do ch = READCHAR();
	LD	gr7, 0, gr1
	CPA	gr7, SPACE	; while (ch == ' ' || ch == '\t' || ch == '\n');
	JZE	RI1
	CPA	gr7, TAB
	JZE	RI1
	CPA	gr7, NEWLINE
	JZE	RI1
	LD	gr5, ONE	; flag = 1;
	CPA	gr7, MINUS	; if (ch == '-') {
	JNZ	RI4
	LD	gr5, gr0	;   flag = 0;
	CALL	READCHAR	;   ch = READCHAR();
	LD	gr7, 0, gr1	; }
RI4
	LD	gr6, gr0	; v = 0;
RI2
	CPA	gr7, ZERO	; while ('0' <= ch && ch <= '9') {
	JMI	RI3
	CPA	gr7, NINE
	JPL	RI3
	MULA	gr6, TEN	;   v = v * 10 + ch - '0';
	ADDA	gr6, gr7
	SUBA	gr6, ZERO
	CALL	READCHAR	;   ch = READCHAR();
	LD	gr7, 0, gr1
	JUMP	RI2	; }
RI3
	ST	gr7, RPBBUF	; push ch back;
	ST	gr6, 0, gr1	; *gr1 = v;
	CPA	gr5, gr0	; if (flag == 0)
	JNZ	RI5
	SUBA	gr5, gr6	;   *gr1 = -v;
	ST	gr5, 0, gr1
RI5
	RPOP
	RET
READLINE
	ST	gr0, IBUFSIZE	; drop the rest of the input line
	ST	gr0, INP
	ST	gr0, RPBBUF
	RET
ONE	DC	1
SIX	DC	6
TEN	DC	10
SPACE	DC	#0020	; ' '
MINUS	DC	#002D	; '-'
TAB	DC	#0009	; '\t'
ZERO	DC	#0030	; '0'
NINE	DC	#0039	; '9'
NEWLINE	DC	#000A	; '\n'
INTBUF	DS	8
OBUFSIZE	DC	0
IBUFSIZE	DC	0
INP	DC	0
OBUF	DS	257
IBUF	DS	257
RPBBUF	DC	0";

pub(crate) fn generate_std_lib() -> Vec<String> {
    RUNTIME_LIBRARY.lines().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_routine_is_defined() {
        let lib = generate_std_lib();
        for name in [
            "EOVF", "E0DIV", "EROV", "WRITECHAR", "WRITESTR", "BOVFCHECK", "WRITEINT",
            "WRITEBOOL", "WRITELINE", "FLUSH", "READCHAR", "READINT", "READLINE",
        ] {
            assert_eq!(lib.iter().filter(|line| *line == name).count(), 1, "{}", name);
        }
        for constant in ["ONE", "NEWLINE", "OBUF", "IBUF", "RPBBUF"] {
            assert!(lib.iter().any(|line| line.starts_with(&format!("{}\t", constant))));
        }
    }
}
